use crate::chat::ChatChannel;
use bytes::Bytes;
use meshcall_core::{IceCandidate, MediaKind, ParticipantId};
use std::fmt;
use std::sync::Arc;

/// One incarnation of a peer handle. `generation` changes whenever the handle for
/// the same participant is recreated, so late events of an old transport can be dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerKey {
    pub id: ParticipantId,
    pub generation: u64,
}

impl PeerKey {
    pub fn new(id: ParticipantId, generation: u64) -> Self {
        Self { id, generation }
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.generation)
    }
}

/// Events a transport reports to the mesh loop.
pub enum TransportEvent {
    /// Local ICE candidate, relayed to the peer right away (trickle).
    CandidateGenerated(PeerKey, IceCandidate),

    /// Chat channel is open.
    DataChannelReady(PeerKey, Arc<dyn ChatChannel>),

    /// Frame received on the chat channel.
    Message(PeerKey, Bytes),

    /// The peer started sending a track.
    RemoteTrack(PeerKey, MediaKind),

    /// Connection could not be recovered (ICE/DTLS failure).
    Failed(PeerKey),

    /// Connection closed.
    Closed(PeerKey),
}

impl TransportEvent {
    pub fn peer(&self) -> &PeerKey {
        match self {
            TransportEvent::CandidateGenerated(peer, _)
            | TransportEvent::DataChannelReady(peer, _)
            | TransportEvent::Message(peer, _)
            | TransportEvent::RemoteTrack(peer, _)
            | TransportEvent::Failed(peer)
            | TransportEvent::Closed(peer) => peer,
        }
    }
}
