use crate::media::{LocalTrack, MediaBundle};
use crate::mesh::PeerRegistry;
use crate::negotiation::NegotiationEvent;
use crate::signaling::SignalingOutput;
use meshcall_core::{MediaKind, ParticipantId};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum TrackAction {
    /// Swap the track on an already negotiated sender. No renegotiation.
    Replace(LocalTrack),
    /// No sender of this kind yet; adding one needs a fresh offer/answer round.
    Add(LocalTrack),
}

/// Decides what a handle with the given sender slots needs to match `bundle`.
pub fn plan(senders: &HashMap<MediaKind, String>, bundle: &MediaBundle) -> Vec<TrackAction> {
    bundle
        .tracks()
        .into_iter()
        .filter_map(|track| match senders.get(&track.kind()) {
            Some(current) if current == track.id() => None,
            Some(_) => Some(TrackAction::Replace(track.clone())),
            None => Some(TrackAction::Add(track.clone())),
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub replaced: Vec<ParticipantId>,
    pub renegotiating: Vec<ParticipantId>,
    pub finished: Vec<ParticipantId>,
}

/// Pushes a new bundle onto every handle. Best effort: a failing peer does not
/// stop the sweep.
pub struct TrackSync;

impl TrackSync {
    pub async fn sweep(
        registry: &mut PeerRegistry,
        bundle: &MediaBundle,
        signaling: &dyn SignalingOutput,
    ) -> SweepReport {
        let mut report = SweepReport::default();

        for peer_id in registry.peer_ids() {
            let Some(handle) = registry.get_mut(&peer_id) else {
                continue;
            };

            let actions = plan(handle.senders(), bundle);
            if actions.is_empty() {
                continue;
            }
            debug!(peer = %peer_id, count = actions.len(), "syncing outgoing tracks");

            let needs_negotiation = handle.apply_tracks(actions).await;
            if needs_negotiation {
                info!(peer = %peer_id, "new sender added, renegotiating");
                let state = handle
                    .drive(NegotiationEvent::RenegotiationNeeded, signaling)
                    .await;
                if state.is_terminal() {
                    report.finished.push(peer_id);
                } else {
                    report.renegotiating.push(peer_id);
                }
            } else {
                report.replaced.push(peer_id);
            }
        }

        report
    }
}
