use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to reach signaling server: {0}")]
    SignalingConnect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("mesh is no longer running")]
    Closed,

    #[error(transparent)]
    Wire(#[from] meshcall_core::Error),
}
