use crate::media::{MediaBundle, TrackAction, plan};
use crate::mesh::DeadlineTimer;
use crate::negotiation::{Effect, Negotiation, NegotiationEvent, NegotiationState, Role};
use crate::signaling::SignalingOutput;
use crate::transport::{PeerKey, PeerTransport};
use anyhow::Result;
use meshcall_core::{MediaKind, ParticipantId};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

/// One remote participant: its negotiation, its transport and the sender slots
/// carrying local media.
pub struct PeerHandle {
    key: PeerKey,
    negotiation: Negotiation,
    transport: Box<dyn PeerTransport>,
    senders: HashMap<MediaKind, String>,
    chat_label: String,
    deadline: DeadlineTimer,
    established: bool,
}

impl PeerHandle {
    pub fn new(
        key: PeerKey,
        role: Role,
        transport: Box<dyn PeerTransport>,
        chat_label: impl Into<String>,
        deadline: DeadlineTimer,
    ) -> Self {
        Self {
            key,
            negotiation: Negotiation::new(role),
            transport,
            senders: HashMap::new(),
            chat_label: chat_label.into(),
            deadline,
            established: false,
        }
    }

    pub fn peer_id(&self) -> &ParticipantId {
        &self.key.id
    }

    pub fn key(&self) -> &PeerKey {
        &self.key
    }

    pub fn role(&self) -> Role {
        self.negotiation.role()
    }

    pub fn state(&self) -> NegotiationState {
        self.negotiation.state()
    }

    /// Track id currently carried by each sender slot.
    pub fn senders(&self) -> &HashMap<MediaKind, String> {
        &self.senders
    }

    /// Returns `true` only the first time.
    pub fn mark_established(&mut self) -> bool {
        !std::mem::replace(&mut self.established, true)
    }

    /// Puts the bundle on the sender slots. Returns `true` when a slot had to
    /// be created, which needs a new offer/answer round.
    pub async fn attach_bundle(&mut self, bundle: &MediaBundle) -> bool {
        let actions = plan(&self.senders, bundle);
        self.apply_tracks(actions).await
    }

    pub async fn apply_tracks(&mut self, actions: Vec<TrackAction>) -> bool {
        let mut added = false;
        for action in actions {
            match action {
                TrackAction::Replace(track) => match self.transport.replace_track(&track).await {
                    Ok(()) => {
                        debug!(peer = %self.key, kind = %track.kind(), track = track.id(), "track replaced");
                        self.senders.insert(track.kind(), track.id().to_owned());
                    }
                    Err(e) => warn!(peer = %self.key, kind = %track.kind(), "replace_track failed: {e:#}"),
                },
                TrackAction::Add(track) => match self.transport.add_track(&track).await {
                    Ok(()) => {
                        debug!(peer = %self.key, kind = %track.kind(), track = track.id(), "sender added");
                        self.senders.insert(track.kind(), track.id().to_owned());
                        added = true;
                    }
                    Err(e) => warn!(peer = %self.key, kind = %track.kind(), "add_track failed: {e:#}"),
                },
            }
        }
        added
    }

    /// Feeds `event` to the negotiation and runs every resulting effect,
    /// including the follow-up events they produce. A failing transport step
    /// abandons the rest of the batch and fails the negotiation.
    pub async fn drive(
        &mut self,
        event: NegotiationEvent,
        signaling: &dyn SignalingOutput,
    ) -> NegotiationState {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let before = self.negotiation.state();
            let effects = self.negotiation.handle(event);
            if self.negotiation.state() != before {
                debug!(peer = %self.key, from = %before, to = %self.negotiation.state(), "negotiation state changed");
            }

            for effect in effects {
                match self.run_effect(effect, signaling).await {
                    Ok(Some(follow_up)) => queue.push_back(follow_up),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(peer = %self.key, "negotiation step failed: {e:#}");
                        queue.clear();
                        queue.push_back(NegotiationEvent::TransportFailed(format!("{e:#}")));
                        break;
                    }
                }
            }
        }

        self.negotiation.state()
    }

    async fn run_effect(
        &mut self,
        effect: Effect,
        signaling: &dyn SignalingOutput,
    ) -> Result<Option<NegotiationEvent>> {
        match effect {
            Effect::OpenChatChannel => {
                self.transport.open_chat_channel(&self.chat_label).await?;
                Ok(None)
            }
            Effect::CreateOffer => {
                let offer = self.transport.create_offer().await?;
                Ok(Some(NegotiationEvent::LocalDescriptionReady(offer)))
            }
            Effect::CreateAnswer => {
                let answer = self.transport.create_answer().await?;
                Ok(Some(NegotiationEvent::LocalDescriptionReady(answer)))
            }
            Effect::SetRemoteDescription(desc) => {
                self.transport.set_remote_description(desc).await?;
                Ok(Some(NegotiationEvent::RemoteDescriptionApplied))
            }
            Effect::Rollback => {
                info!(peer = %self.key, "rolling back local offer");
                self.transport.rollback().await?;
                Ok(None)
            }
            Effect::ApplyCandidate(candidate) => {
                // a single bad candidate does not end the session
                if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                    warn!(peer = %self.key, "failed to add ICE candidate: {e:#}");
                }
                Ok(None)
            }
            Effect::Relay(payload) => {
                signaling.relay(self.key.id.clone(), payload).await;
                Ok(None)
            }
            Effect::ArmDeadline(round) => {
                self.deadline.arm(self.key.clone(), round);
                Ok(None)
            }
            Effect::Teardown => {
                info!(peer = %self.key, state = %self.negotiation.state(), "tearing down peer connection");
                self.senders.clear();
                if let Err(e) = self.transport.close().await {
                    warn!(peer = %self.key, "failed to close transport: {e:#}");
                }
                Ok(None)
            }
        }
    }
}
