use crate::chat::ChatEntry;
use crate::negotiation::{NegotiationState, Role};
use meshcall_core::ParticipantId;
use tokio::sync::oneshot;

/// Application commands for the mesh actor.
#[derive(Debug)]
pub enum MeshCommand {
    /// Send a chat message to every peer.
    SendChat { body: String },

    /// Expand or collapse the chat view.
    SetChatOpen(bool),

    /// Request the current state.
    Snapshot(oneshot::Sender<MeshSnapshot>),

    /// Leave the call: close every connection and stop the loop.
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSummary {
    pub peer_id: ParticipantId,
    pub role: Role,
    pub state: NegotiationState,
}

#[derive(Debug, Clone, Default)]
pub struct MeshSnapshot {
    pub self_id: Option<ParticipantId>,
    pub peers: Vec<PeerSummary>,
    pub timeline: Vec<ChatEntry>,
    pub unread: usize,
    pub chat_open: bool,
}

impl MeshSnapshot {
    pub fn roster(&self) -> Vec<ParticipantId> {
        self.self_id
            .iter()
            .cloned()
            .chain(self.peers.iter().map(|p| p.peer_id.clone()))
            .collect()
    }

    pub fn peer(&self, peer_id: &ParticipantId) -> Option<&PeerSummary> {
        self.peers.iter().find(|p| &p.peer_id == peer_id)
    }
}
