use crate::chat::ChatChannel;
use futures::future::join_all;
use meshcall_core::{ChatMessage, ParticipantId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A timeline line. `from` is `None` for messages written locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub message: ChatMessage,
    pub from: Option<ParticipantId>,
}

impl ChatEntry {
    pub fn is_local(&self) -> bool {
        self.from.is_none()
    }
}

/// Chat over each peer's data channel: one timeline and an unread counter.
pub struct ChatOverlay {
    local_label: String,
    channels: HashMap<ParticipantId, Arc<dyn ChatChannel>>,
    timeline: Vec<ChatEntry>,
    unread: usize,
    view_open: bool,
}

impl ChatOverlay {
    pub fn new(local_label: impl Into<String>, view_open: bool) -> Self {
        Self {
            local_label: local_label.into(),
            channels: HashMap::new(),
            timeline: Vec::new(),
            unread: 0,
            view_open,
        }
    }

    pub fn attach(&mut self, peer_id: ParticipantId, channel: Arc<dyn ChatChannel>) {
        debug!(peer = %peer_id, "chat channel attached");
        self.channels.insert(peer_id, channel);
    }

    pub fn detach(&mut self, peer_id: &ParticipantId) {
        if self.channels.remove(peer_id).is_some() {
            debug!(peer = %peer_id, "chat channel detached");
        }
    }

    /// Writes to every open channel and records the message locally, even when
    /// nobody received it.
    pub async fn send(&mut self, body: impl Into<String>) -> ChatEntry {
        let message = ChatMessage::new(self.local_label.clone(), body);

        match message.encode() {
            Ok(frame) => {
                let open: Vec<_> = self
                    .channels
                    .iter()
                    .filter(|(_, channel)| channel.is_open())
                    .map(|(peer_id, channel)| (peer_id.clone(), channel.clone()))
                    .collect();

                let sends = open.iter().map(|(peer_id, channel)| {
                    let frame = frame.clone();
                    async move {
                        if let Err(e) = channel.deliver(frame).await {
                            error!(peer = %peer_id, "failed to send chat message: {e}");
                        }
                    }
                });
                join_all(sends).await;
            }
            Err(e) => error!("failed to encode chat message: {e}"),
        }

        let entry = ChatEntry {
            message,
            from: None,
        };
        self.timeline.push(entry.clone());
        entry
    }

    /// Decodes a data channel frame. Malformed frames are dropped.
    pub fn receive(&mut self, peer_id: ParticipantId, data: &[u8]) -> Option<ChatEntry> {
        match ChatMessage::decode(data) {
            Ok(message) => Some(self.append(message, peer_id)),
            Err(e) => {
                warn!(peer = %peer_id, "dropping chat frame: {e}");
                None
            }
        }
    }

    /// Chat that arrived through the signaling relay instead of a data channel.
    pub fn record_relayed(&mut self, from: ParticipantId, message: ChatMessage) -> ChatEntry {
        self.append(message, from)
    }

    pub fn set_view_open(&mut self, open: bool) {
        self.view_open = open;
        if open {
            self.unread = 0;
        }
    }

    pub fn is_view_open(&self) -> bool {
        self.view_open
    }

    pub fn timeline(&self) -> &[ChatEntry] {
        &self.timeline
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    fn append(&mut self, message: ChatMessage, from: ParticipantId) -> ChatEntry {
        if !self.view_open {
            self.unread += 1;
        }
        let entry = ChatEntry {
            message,
            from: Some(from),
        };
        self.timeline.push(entry.clone());
        entry
    }
}
