use crate::negotiation::Role;
use meshcall_core::{IceCandidate, SdpType, SessionDescription, SignalPayload};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    New,
    OfferSent,
    OfferReceived,
    Stable,
    Closed,
    Failed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Closed | NegotiationState::Failed)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Inputs to a peer's negotiation.
#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationEvent {
    Start,
    /// A description built by the transport was set as local.
    LocalDescriptionReady(SessionDescription),
    RemoteDescription(SessionDescription),
    /// The transport accepted the remote description requested by the last effect.
    RemoteDescriptionApplied,
    RemoteCandidate(IceCandidate),
    LocalCandidate(IceCandidate),
    RenegotiationNeeded,
    DeadlineElapsed(u64),
    TransportFailed(String),
    Close,
}

/// Work the driver performs against the transport or the signaling channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenChatChannel,
    CreateOffer,
    CreateAnswer,
    SetRemoteDescription(SessionDescription),
    Rollback,
    ApplyCandidate(IceCandidate),
    Relay(SignalPayload),
    ArmDeadline(u64),
    Teardown,
}

/// Per-peer offer/answer state machine.
///
/// `handle` is pure: it updates the state and returns the effects to run. Effects
/// that complete asynchronously report back through a follow-up event
/// (`LocalDescriptionReady`, `RemoteDescriptionApplied`, `TransportFailed`).
#[derive(Debug)]
pub struct Negotiation {
    role: Role,
    state: NegotiationState,
    has_remote_description: bool,
    applying: Option<SdpType>,
    pending_candidates: VecDeque<IceCandidate>,
    renegotiate_when_stable: bool,
    round: u64,
}

impl Negotiation {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            state: NegotiationState::New,
            has_remote_description: false,
            applying: None,
            pending_candidates: VecDeque::new(),
            renegotiate_when_stable: false,
            round: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn pending_candidates(&self) -> impl Iterator<Item = &IceCandidate> {
        self.pending_candidates.iter()
    }

    pub fn handle(&mut self, event: NegotiationEvent) -> Vec<Effect> {
        if self.state.is_terminal() {
            debug!(state = %self.state, ?event, "ignoring event for finished negotiation");
            return Vec::new();
        }

        match event {
            NegotiationEvent::Start => self.on_start(),
            NegotiationEvent::LocalDescriptionReady(desc) => self.on_local_description(desc),
            NegotiationEvent::RemoteDescription(desc) => self.on_remote_description(desc),
            NegotiationEvent::RemoteDescriptionApplied => self.on_remote_applied(),
            NegotiationEvent::RemoteCandidate(candidate) => {
                if self.has_remote_description {
                    vec![Effect::ApplyCandidate(candidate)]
                } else {
                    self.pending_candidates.push_back(candidate);
                    Vec::new()
                }
            }
            NegotiationEvent::LocalCandidate(candidate) => {
                vec![Effect::Relay(SignalPayload::Ice(candidate))]
            }
            NegotiationEvent::RenegotiationNeeded => {
                if self.state == NegotiationState::Stable {
                    self.begin_offer()
                } else {
                    self.renegotiate_when_stable = true;
                    Vec::new()
                }
            }
            NegotiationEvent::DeadlineElapsed(round) => {
                if round == self.round && self.state != NegotiationState::Stable {
                    warn!(state = %self.state, round, "negotiation timed out");
                    self.fail()
                } else {
                    Vec::new()
                }
            }
            NegotiationEvent::TransportFailed(reason) => {
                warn!(state = %self.state, %reason, "transport failure during negotiation");
                self.fail()
            }
            NegotiationEvent::Close => {
                self.state = NegotiationState::Closed;
                self.pending_candidates.clear();
                vec![Effect::Teardown]
            }
        }
    }

    fn on_start(&mut self) -> Vec<Effect> {
        if self.state != NegotiationState::New || self.round > 0 {
            return Vec::new();
        }
        self.round = 1;
        match self.role {
            Role::Offerer => vec![
                Effect::OpenChatChannel,
                Effect::CreateOffer,
                Effect::ArmDeadline(self.round),
            ],
            Role::Answerer => vec![Effect::ArmDeadline(self.round)],
        }
    }

    fn begin_offer(&mut self) -> Vec<Effect> {
        self.round += 1;
        self.renegotiate_when_stable = false;
        vec![Effect::CreateOffer, Effect::ArmDeadline(self.round)]
    }

    fn on_local_description(&mut self, desc: SessionDescription) -> Vec<Effect> {
        match (desc.sdp_type, self.state) {
            (SdpType::Offer, NegotiationState::New | NegotiationState::Stable) => {
                self.state = NegotiationState::OfferSent;
                vec![Effect::Relay(SignalPayload::Sdp(desc))]
            }
            (SdpType::Answer, NegotiationState::OfferReceived) => {
                self.state = NegotiationState::Stable;
                let mut effects = vec![Effect::Relay(SignalPayload::Sdp(desc))];
                effects.extend(self.after_stable());
                effects
            }
            (sdp_type, state) => {
                warn!(?sdp_type, %state, "local description does not fit current state");
                Vec::new()
            }
        }
    }

    fn on_remote_description(&mut self, desc: SessionDescription) -> Vec<Effect> {
        match desc.sdp_type {
            SdpType::Offer => self.on_remote_offer(desc),
            SdpType::Answer => {
                if self.state == NegotiationState::OfferSent && self.applying.is_none() {
                    self.applying = Some(SdpType::Answer);
                    vec![Effect::SetRemoteDescription(desc)]
                } else {
                    debug!(state = %self.state, "dropping unexpected answer");
                    Vec::new()
                }
            }
            SdpType::Rollback => {
                debug!("remote rollback descriptions are not relayed; ignoring");
                Vec::new()
            }
        }
    }

    fn on_remote_offer(&mut self, desc: SessionDescription) -> Vec<Effect> {
        match (self.state, self.role) {
            (NegotiationState::New, Role::Answerer) => {
                self.state = NegotiationState::OfferReceived;
                self.applying = Some(SdpType::Offer);
                vec![Effect::SetRemoteDescription(desc)]
            }
            (NegotiationState::Stable, _) => {
                self.state = NegotiationState::OfferReceived;
                self.applying = Some(SdpType::Offer);
                self.round += 1;
                vec![
                    Effect::SetRemoteDescription(desc),
                    Effect::ArmDeadline(self.round),
                ]
            }
            // Renegotiation glare: the original answerer yields.
            (NegotiationState::OfferSent, Role::Answerer) if self.applying.is_none() => {
                self.state = NegotiationState::OfferReceived;
                self.applying = Some(SdpType::Offer);
                self.renegotiate_when_stable = true;
                self.round += 1;
                vec![
                    Effect::Rollback,
                    Effect::SetRemoteDescription(desc),
                    Effect::ArmDeadline(self.round),
                ]
            }
            (state, role) => {
                debug!(%state, %role, "dropping remote offer");
                Vec::new()
            }
        }
    }

    fn on_remote_applied(&mut self) -> Vec<Effect> {
        let Some(applied) = self.applying.take() else {
            warn!(state = %self.state, "remote description applied without a request");
            return Vec::new();
        };
        self.has_remote_description = true;

        let mut effects: Vec<Effect> = self
            .pending_candidates
            .drain(..)
            .map(Effect::ApplyCandidate)
            .collect();

        match applied {
            SdpType::Offer => effects.push(Effect::CreateAnswer),
            SdpType::Answer => {
                self.state = NegotiationState::Stable;
                effects.extend(self.after_stable());
            }
            SdpType::Rollback => {}
        }
        effects
    }

    fn after_stable(&mut self) -> Vec<Effect> {
        if self.renegotiate_when_stable {
            self.begin_offer()
        } else {
            Vec::new()
        }
    }

    fn fail(&mut self) -> Vec<Effect> {
        self.state = NegotiationState::Failed;
        self.pending_candidates.clear();
        vec![Effect::Teardown]
    }
}
