use crate::media::LocalTrack;
use crate::transport::{PeerKey, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use meshcall_core::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;

/// One peer connection as seen by the negotiation driver.
///
/// `create_offer` and `create_answer` both build the description and set it as
/// local before returning it.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn open_chat_channel(&self, label: &str) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Abandons an outstanding local offer.
    async fn rollback(&self) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Creates the sender slot for the track's kind.
    async fn add_track(&self, track: &LocalTrack) -> Result<()>;

    /// Swaps the track on the existing sender of the same kind.
    async fn replace_track(&self, track: &LocalTrack) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        peer: PeerKey,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}
