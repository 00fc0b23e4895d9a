use crate::transport::PeerKey;
use std::time::Duration;
use tokio::sync::mpsc;

/// A negotiation round that ran out of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadline {
    pub peer: PeerKey,
    pub round: u64,
}

#[derive(Debug, Clone)]
pub struct DeadlineTimer {
    tx: mpsc::UnboundedSender<Deadline>,
    timeout: Option<Duration>,
}

impl DeadlineTimer {
    /// `None` disables the timeout.
    pub fn new(timeout: Option<Duration>, tx: mpsc::UnboundedSender<Deadline>) -> Self {
        Self { tx, timeout }
    }

    pub fn arm(&self, peer: PeerKey, round: u64) {
        let Some(timeout) = self.timeout else {
            return;
        };
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(Deadline { peer, round });
        });
    }
}
