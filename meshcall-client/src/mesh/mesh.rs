use crate::MeshConfig;
use crate::chat::ChatOverlay;
use crate::media::{MediaBundle, TrackSync};
use crate::mesh::{
    Deadline, DeadlineTimer, JoinPlan, MeshCommand, MeshHandle, MeshObserver, MeshSnapshot,
    PeerHandle, PeerRegistry,
};
use crate::negotiation::{NegotiationEvent, Role};
use crate::signaling::{SignalingEvent, SignalingOutput};
use crate::transport::{TransportEvent, TransportFactory};
use meshcall_core::{ChatMessage, ParticipantId, SdpType, SignalPayload};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// The call actor.
/// Owns the peer registry, the chat and the local media subscription; all state
/// changes happen inside [`Mesh::run`].
pub struct Mesh {
    config: MeshConfig,
    self_id: Option<ParticipantId>,
    registry: PeerRegistry,
    chat: ChatOverlay,

    /// Application callbacks (rendering, notifications).
    observer: Arc<dyn MeshObserver>,

    /// Outbound frames to the signaling server.
    signaling: Arc<dyn SignalingOutput>,
    /// Inbound signaling events.
    signaling_rx: mpsc::Receiver<SignalingEvent>,

    transports: Arc<dyn TransportFactory>,
    /// Cloned into every transport.
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,

    deadline: DeadlineTimer,
    deadline_rx: mpsc::UnboundedReceiver<Deadline>,

    command_rx: mpsc::Receiver<MeshCommand>,
    media: watch::Receiver<MediaBundle>,
}

impl Mesh {
    pub fn new(
        config: MeshConfig,
        signaling: Arc<dyn SignalingOutput>,
        signaling_rx: mpsc::Receiver<SignalingEvent>,
        transports: Arc<dyn TransportFactory>,
        media: watch::Receiver<MediaBundle>,
        observer: Arc<dyn MeshObserver>,
    ) -> (Self, MeshHandle) {
        let buffer = config.event_buffer.max(1);
        let (transport_tx, transport_rx) = mpsc::channel(buffer);
        let (command_tx, command_rx) = mpsc::channel(buffer);
        let (deadline_tx, deadline_rx) = mpsc::unbounded_channel();

        let mesh = Self {
            self_id: None,
            registry: PeerRegistry::new(),
            chat: ChatOverlay::new(config.display_name.clone(), config.chat_open_on_start),
            observer,
            signaling,
            signaling_rx,
            transports,
            transport_tx,
            transport_rx,
            deadline: DeadlineTimer::new(config.negotiation_timeout(), deadline_tx),
            deadline_rx,
            command_rx,
            media,
            config,
        };
        (mesh, MeshHandle::new(command_tx))
    }

    /// Main loop, meant for `tokio::spawn`. Returns on `leave`, when the
    /// signaling connection drops or once every [`MeshHandle`] is gone.
    pub async fn run(mut self) {
        info!(room = %self.config.room, "mesh event loop started");
        let mut media_live = true;

        loop {
            tokio::select! {
                evt = self.signaling_rx.recv() => match evt {
                    Some(SignalingEvent::Disconnected) | None => {
                        warn!("signaling channel lost, leaving the call");
                        break;
                    }
                    Some(e) => self.handle_signaling(e).await,
                },

                cmd = self.command_rx.recv() => match cmd {
                    Some(MeshCommand::Leave) | None => {
                        info!("leaving the call");
                        break;
                    }
                    Some(c) => self.handle_command(c).await,
                },

                Some(evt) = self.transport_rx.recv() => self.handle_transport_event(evt).await,

                Some(deadline) = self.deadline_rx.recv() => self.handle_deadline(deadline).await,

                changed = self.media.changed(), if media_live => match changed {
                    Ok(()) => self.sync_media().await,
                    Err(_) => {
                        debug!("local media source dropped");
                        media_live = false;
                    }
                },
            }
        }

        self.shutdown().await;
        info!("mesh event loop finished");
    }

    async fn handle_signaling(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Connected(id) => {
                info!(self_id = %id, room = %self.config.room, "connected, joining call");
                self.self_id = Some(id);
                self.signaling.join(&self.config.room).await;
            }
            SignalingEvent::ParticipantJoined { id, roster } => {
                self.on_participant_joined(id, roster).await;
            }
            SignalingEvent::ParticipantLeft(id) => {
                info!(peer = %id, "participant left");
                self.registry.mark_departed(id.clone());
                if self.close_peer(&id, "participant left").await {
                    self.notify_roster().await;
                }
            }
            SignalingEvent::Signal { from, payload } => self.on_signal(from, payload).await,
            SignalingEvent::ChatMessage { from, sender, body } => {
                if self.self_id.as_ref() == Some(&from) {
                    return;
                }
                let entry = self
                    .chat
                    .record_relayed(from, ChatMessage::new(sender, body));
                self.observer
                    .on_chat_message(entry, self.chat.unread())
                    .await;
            }
            SignalingEvent::Disconnected => {}
        }
    }

    async fn on_participant_joined(&mut self, newcomer: ParticipantId, roster: Vec<ParticipantId>) {
        let Some(self_id) = self.self_id.clone() else {
            warn!(peer = %newcomer, "join event before our own id is known; ignoring");
            return;
        };
        if newcomer == self_id {
            info!(members = roster.len(), "joined the call");
        } else {
            info!(peer = %newcomer, "participant joined");
        }

        self.registry.forget_departed(&newcomer);
        self.registry.prune_departed(&roster);
        let plan = JoinPlan::compute(&self_id, &newcomer, &roster, &self.registry.peer_ids());

        for id in plan.stale {
            self.close_peer(&id, "missing from roster").await;
        }
        for (id, role) in plan.create {
            if self.registry.is_departed(&id) {
                debug!(peer = %id, "roster lists a departed participant; skipping");
                continue;
            }
            self.open_peer(id, role).await;
        }

        self.notify_roster().await;
    }

    async fn on_signal(&mut self, from: ParticipantId, payload: String) {
        if self.self_id.as_ref() == Some(&from) {
            return;
        }

        let event = match SignalPayload::decode(&payload) {
            Ok(SignalPayload::Sdp(desc)) => NegotiationEvent::RemoteDescription(desc),
            Ok(SignalPayload::Ice(candidate)) => NegotiationEvent::RemoteCandidate(candidate),
            Err(e) => {
                warn!(peer = %from, "dropping signal: {e}");
                return;
            }
        };

        let event = if self.registry.contains(&from) {
            event
        } else {
            if self.registry.is_departed(&from) {
                debug!(peer = %from, "signal from a departed peer dropped");
                return;
            }
            let event = match event {
                // the offer or join event that creates the handle may still be in flight
                NegotiationEvent::RemoteCandidate(candidate) => {
                    debug!(peer = %from, "holding candidate from unknown peer");
                    self.registry.buffer_candidate(from, candidate);
                    return;
                }
                event => event,
            };
            let is_offer = matches!(
                &event,
                NegotiationEvent::RemoteDescription(desc) if desc.sdp_type == SdpType::Offer
            );
            if !is_offer {
                debug!(peer = %from, "signal for unknown peer dropped");
                return;
            }
            info!(peer = %from, "offer from a peer missing from the roster, answering");
            if !self.open_peer(from.clone(), Role::Answerer).await {
                return;
            }
            self.notify_roster().await;
            event
        };

        let Some(handle) = self.registry.get_mut(&from) else {
            return;
        };
        let state = handle.drive(event, self.signaling.as_ref()).await;
        if state.is_terminal() {
            self.close_peer(&from, "negotiation failed").await;
            self.notify_roster().await;
        }
    }

    /// Creates, equips and starts a handle. Returns `false` if it never got going.
    async fn open_peer(&mut self, id: ParticipantId, role: Role) -> bool {
        let key = self.registry.next_key(&id);
        let transport = match self
            .transports
            .create(key.clone(), self.transport_tx.clone())
            .await
        {
            Ok(transport) => transport,
            Err(e) => {
                error!(peer = %id, "failed to create transport: {e:#}");
                return false;
            }
        };

        let mut handle = PeerHandle::new(
            key,
            role,
            transport,
            self.config.chat_label.clone(),
            self.deadline.clone(),
        );

        // the initial round carries the current bundle
        let bundle = self.media.borrow().clone();
        handle.attach_bundle(&bundle).await;

        info!(peer = %handle.key(), %role, "peer handle created");
        let state = handle
            .drive(NegotiationEvent::Start, self.signaling.as_ref())
            .await;
        if state.is_terminal() {
            warn!(peer = %id, %state, "negotiation did not start");
            return false;
        }

        if let Some(mut previous) = self.registry.insert(handle) {
            previous
                .drive(NegotiationEvent::Close, self.signaling.as_ref())
                .await;
        }

        let early = self.registry.take_early_candidates(&id);
        if let Some(handle) = self.registry.get_mut(&id) {
            if !early.is_empty() {
                debug!(peer = %handle.key(), count = early.len(), "replaying early candidates");
            }
            for candidate in early {
                handle
                    .drive(
                        NegotiationEvent::RemoteCandidate(candidate),
                        self.signaling.as_ref(),
                    )
                    .await;
            }
        }
        true
    }

    /// Returns `true` if a handle was removed.
    async fn close_peer(&mut self, id: &ParticipantId, reason: &str) -> bool {
        let Some(mut handle) = self.registry.remove(id) else {
            return false;
        };
        info!(peer = %handle.key(), reason, "closing peer");
        handle
            .drive(NegotiationEvent::Close, self.signaling.as_ref())
            .await;
        self.chat.detach(id);
        self.observer.on_connection_closed(id.clone()).await;
        true
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        if !self.registry.is_current(event.peer()) {
            debug!(peer = %event.peer(), "event from a closed transport ignored");
            return;
        }

        match event {
            TransportEvent::CandidateGenerated(key, candidate) => {
                let Some(handle) = self.registry.get_mut(&key.id) else {
                    return;
                };
                handle
                    .drive(
                        NegotiationEvent::LocalCandidate(candidate),
                        self.signaling.as_ref(),
                    )
                    .await;
            }
            TransportEvent::DataChannelReady(key, channel) => {
                self.chat.attach(key.id.clone(), channel);
                let first = self
                    .registry
                    .get_mut(&key.id)
                    .is_some_and(|handle| handle.mark_established());
                if first {
                    info!(peer = %key, "connection established");
                    self.observer.on_connection_established(key.id).await;
                }
            }
            TransportEvent::Message(key, data) => {
                if let Some(entry) = self.chat.receive(key.id, &data) {
                    self.observer
                        .on_chat_message(entry, self.chat.unread())
                        .await;
                }
            }
            TransportEvent::RemoteTrack(key, kind) => {
                debug!(peer = %key, %kind, "remote track");
                self.observer.on_remote_track(key.id, kind).await;
            }
            TransportEvent::Failed(key) => {
                if let Some(handle) = self.registry.get_mut(&key.id) {
                    handle
                        .drive(
                            NegotiationEvent::TransportFailed("connection failed".into()),
                            self.signaling.as_ref(),
                        )
                        .await;
                }
                self.close_peer(&key.id, "connection failed").await;
                self.notify_roster().await;
            }
            TransportEvent::Closed(key) => {
                if self.close_peer(&key.id, "transport closed").await {
                    self.notify_roster().await;
                }
            }
        }
    }

    async fn handle_deadline(&mut self, deadline: Deadline) {
        if !self.registry.is_current(&deadline.peer) {
            return;
        }
        let Some(handle) = self.registry.get_mut(&deadline.peer.id) else {
            return;
        };
        let state = handle
            .drive(
                NegotiationEvent::DeadlineElapsed(deadline.round),
                self.signaling.as_ref(),
            )
            .await;
        if state.is_terminal() {
            self.close_peer(&deadline.peer.id, "negotiation timed out")
                .await;
            self.notify_roster().await;
        }
    }

    async fn sync_media(&mut self) {
        let bundle = self.media.borrow_and_update().clone();
        debug!(
            video = %bundle.video.id(),
            audio = %bundle.audio.id(),
            screen_sharing = bundle.screen_sharing,
            "local media changed"
        );
        let report =
            TrackSync::sweep(&mut self.registry, &bundle, self.signaling.as_ref()).await;
        debug!(
            replaced = ?report.replaced,
            renegotiating = ?report.renegotiating,
            finished = ?report.finished,
            "media sweep done"
        );
        if report.finished.is_empty() {
            return;
        }
        for id in report.finished {
            self.close_peer(&id, "renegotiation failed").await;
        }
        self.notify_roster().await;
    }

    async fn handle_command(&mut self, cmd: MeshCommand) {
        match cmd {
            MeshCommand::SendChat { body } => {
                let entry = self.chat.send(body).await;
                self.observer
                    .on_chat_message(entry, self.chat.unread())
                    .await;
            }
            MeshCommand::SetChatOpen(open) => self.chat.set_view_open(open),
            MeshCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            MeshCommand::Leave => {}
        }
    }

    fn snapshot(&self) -> MeshSnapshot {
        MeshSnapshot {
            self_id: self.self_id.clone(),
            peers: self.registry.summaries(),
            timeline: self.chat.timeline().to_vec(),
            unread: self.chat.unread(),
            chat_open: self.chat.is_view_open(),
        }
    }

    async fn notify_roster(&self) {
        let roster = self
            .self_id
            .iter()
            .cloned()
            .chain(self.registry.peer_ids())
            .collect();
        self.observer.on_roster_changed(roster).await;
    }

    async fn shutdown(&mut self) {
        for mut handle in self.registry.drain() {
            handle
                .drive(NegotiationEvent::Close, self.signaling.as_ref())
                .await;
            self.chat.detach(handle.peer_id());
            self.observer
                .on_connection_closed(handle.peer_id().clone())
                .await;
        }
    }
}
