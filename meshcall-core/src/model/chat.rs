use crate::error::Error;
use serde::{Deserialize, Serialize};

/// A chat line as it travels over a peer's data channel.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct ChatMessage {
    pub sender: String,
    pub body: String,
}

impl ChatMessage {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }

    pub fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(Error::Encode)
    }

    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(data).map_err(Error::MalformedChat)
    }
}
