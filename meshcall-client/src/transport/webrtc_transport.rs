use crate::chat::ChatChannel;
use crate::media::LocalTrack;
use crate::transport::{PeerKey, PeerTransport, TransportConfig, TransportEvent, TransportFactory};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use meshcall_core::{IceCandidate, MediaKind, SdpType, SessionDescription};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_remote::TrackRemote;

/// Wrapper around the `RTCPeerConnection` for one remote participant.
pub struct WebRtcTransport {
    peer: PeerKey,
    peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<MediaKind, Arc<RTCRtpSender>>>,
    events: mpsc::Sender<TransportEvent>,
}

impl WebRtcTransport {
    /// Sets up a new peer connection. Callbacks report into `events`, which the
    /// mesh loop reads.
    pub async fn new(
        peer: PeerKey,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("failed to create peer connection")?,
        );

        let state_tx = events.clone();
        let uid_state = peer.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let uid = uid_state.clone();

                Box::pin(async move {
                    info!(peer = %uid, state = %s, "peer connection state changed");
                    match s {
                        RTCPeerConnectionState::Failed => {
                            let _ = tx.send(TransportEvent::Failed(uid)).await;
                        }
                        RTCPeerConnectionState::Closed => {
                            let _ = tx.send(TransportEvent::Closed(uid)).await;
                        }
                        // ICE may still recover on its own
                        RTCPeerConnectionState::Disconnected => {
                            warn!(peer = %uid, "peer connection interrupted");
                        }
                        _ => {}
                    }
                })
            },
        ));

        // Trickle ICE
        let ice_tx = events.clone();
        let uid_ice = peer.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let uid = uid_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let init = match candidate.to_json() {
                    Ok(init) => init,
                    Err(err) => {
                        warn!(peer = %uid, %err, "failed to serialize local candidate");
                        return;
                    }
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(uid, from_rtc_candidate(init)))
                    .await;
            })
        }));

        // channel created by the remote side (we are the answerer)
        let dc_tx = events.clone();
        let uid_dc = peer.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let uid = uid_dc.clone();
            Box::pin(async move {
                debug!(peer = %uid, label = dc.label(), "remote data channel announced");
                wire_data_channel(uid, dc, tx);
            })
        }));

        let track_tx = events.clone();
        let uid_track = peer.clone();
        peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            let tx = track_tx.clone();
            let uid = uid_track.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => MediaKind::Audio,
                    RTPCodecType::Video => MediaKind::Video,
                    other => {
                        debug!(peer = %uid, ?other, "ignoring track of unknown kind");
                        return;
                    }
                };
                let _ = tx.send(TransportEvent::RemoteTrack(uid, kind)).await;
            })
        }));

        Ok(Self {
            peer,
            peer_connection,
            senders: Mutex::new(HashMap::new()),
            events,
        })
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn open_chat_channel(&self, label: &str) -> Result<()> {
        let dc = self
            .peer_connection
            .create_data_channel(label, None)
            .await
            .context("failed to create chat channel")?;
        wire_data_channel(self.peer.clone(), dc, self.events.clone());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
            SdpType::Rollback => bail!("rollback is never applied as a remote description"),
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let Some(mut pending) = self.peer_connection.pending_local_description().await else {
            return Ok(());
        };
        pending.sdp_type = RTCSdpType::Rollback;
        self.peer_connection
            .set_local_description(pending)
            .await
            .context("rollback rejected")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await?;
        Ok(())
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<()> {
        let sender = self
            .peer_connection
            .add_track(track.rtp_track())
            .await
            .with_context(|| format!("failed to add {} track", track.kind()))?;

        // RTCP has to be drained for the interceptors to run
        let rtcp_sender = sender.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        self.senders.lock().await.insert(track.kind(), sender);
        Ok(())
    }

    async fn replace_track(&self, track: &LocalTrack) -> Result<()> {
        let sender = self
            .senders
            .lock()
            .await
            .get(&track.kind())
            .cloned()
            .ok_or_else(|| anyhow!("no {} sender to replace on", track.kind()))?;
        sender.replace_track(Some(track.rtp_track())).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Creates one [`WebRtcTransport`] per remote participant.
#[derive(Debug, Clone, Default)]
pub struct WebRtcTransportFactory {
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        peer: PeerKey,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>> {
        let transport = WebRtcTransport::new(peer, &self.config, events).await?;
        Ok(Box::new(transport))
    }
}

fn wire_data_channel(
    peer: PeerKey,
    dc: Arc<RTCDataChannel>,
    events: mpsc::Sender<TransportEvent>,
) {
    let dc_on_open = dc.clone();
    let tx_open = events.clone();
    let uid_open = peer.clone();
    dc.on_open(Box::new(move || {
        let tx = tx_open.clone();
        let uid = uid_open.clone();
        let channel: Arc<dyn ChatChannel> = dc_on_open.clone();

        Box::pin(async move {
            info!(peer = %uid, "chat channel open");
            let _ = tx.send(TransportEvent::DataChannelReady(uid, channel)).await;
        })
    }));

    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = events.clone();
        let uid = peer.clone();
        Box::pin(async move {
            let bytes = Bytes::from(msg.data.to_vec());
            let _ = tx.send(TransportEvent::Message(uid, bytes)).await;
        })
    }));
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}
