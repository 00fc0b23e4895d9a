use meshcall_client::signaling::SignalingEvent;
use meshcall_core::ParticipantId;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::utils::SignalRecord;

/// Stand-in for the relay server: forwards every relayed payload to the
/// target's signaling channel, tagged with the sender.
#[derive(Default)]
pub struct RelayHub {
    inboxes: HashMap<ParticipantId, mpsc::Sender<SignalingEvent>>,
    outboxes: Vec<(ParticipantId, mpsc::UnboundedReceiver<SignalRecord>)>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: ParticipantId,
        inbox: mpsc::Sender<SignalingEvent>,
        outbox: mpsc::UnboundedReceiver<SignalRecord>,
    ) {
        self.inboxes.insert(id.clone(), inbox);
        self.outboxes.push((id, outbox));
    }

    /// Spawn one forwarding task per participant.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let inboxes = self.inboxes;
        self.outboxes
            .into_iter()
            .map(|(from, mut outbox)| {
                let inboxes = inboxes.clone();
                tokio::spawn(async move {
                    while let Some(record) = outbox.recv().await {
                        let SignalRecord::Relay { target, payload } = record else {
                            continue;
                        };
                        let Some(inbox) = inboxes.get(&target) else {
                            tracing::warn!("[RelayHub] no inbox for {target}");
                            continue;
                        };
                        let payload = payload.encode().expect("encodable payload");
                        let event = SignalingEvent::Signal {
                            from: from.clone(),
                            payload,
                        };
                        if inbox.send(event).await.is_err() {
                            break;
                        }
                    }
                })
            })
            .collect()
    }
}
