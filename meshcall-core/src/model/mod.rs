mod chat;
mod media;
mod participant;
mod signaling;

pub use chat::ChatMessage;
pub use media::MediaKind;
pub use participant::ParticipantId;
pub use signaling::{
    ClientMessage, IceCandidate, IceServerConfig, SdpType, ServerMessage, SessionDescription,
    SignalPayload,
};
