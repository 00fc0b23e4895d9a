use crate::chat::ChatEntry;
use async_trait::async_trait;
use meshcall_core::{MediaKind, ParticipantId};

/// Hooks for the embedding application (rendering, notifications).
#[async_trait]
pub trait MeshObserver: Send + Sync + 'static {
    /// The chat channel to `peer_id` is open.
    async fn on_connection_established(&self, peer_id: ParticipantId);

    /// The participant is gone; drop its media.
    async fn on_connection_closed(&self, peer_id: ParticipantId);

    async fn on_remote_track(&self, _peer_id: ParticipantId, _kind: MediaKind) {}

    async fn on_chat_message(&self, entry: ChatEntry, unread: usize);

    /// `roster` is the local participant followed by every connected peer.
    async fn on_roster_changed(&self, _roster: Vec<ParticipantId>) {}
}
