use async_trait::async_trait;
use meshcall_core::{ParticipantId, SignalPayload};

/// Outbound side of the signaling server.
/// The server forwards `payload` without looking into it.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Join the room once our own id is known.
    async fn join(&self, room: &str);

    /// Relay an SDP or ICE candidate to one participant.
    async fn relay(&self, target: ParticipantId, payload: SignalPayload);
}
