use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed signal payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("malformed chat frame: {0}")]
    MalformedChat(#[source] serde_json::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}
