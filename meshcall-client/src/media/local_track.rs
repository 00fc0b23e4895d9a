use meshcall_core::MediaKind;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const LOCAL_STREAM_ID: &str = "meshcall-local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackSource {
    Camera,
    Microphone,
    Screen,
    /// Disabled stand-in: nothing is ever written to it, so peers see a black
    /// frame or hear silence.
    Placeholder,
}

/// A track that can sit in a sender slot. Real and placeholder tracks share
/// this type so sender handling does not care about toggle state.
#[derive(Clone)]
pub struct LocalTrack {
    id: String,
    kind: MediaKind,
    source: TrackSource,
    rtp: Arc<TrackLocalStaticSample>,
}

impl LocalTrack {
    /// Wraps a track fed by an external capture pipeline.
    pub fn new(kind: MediaKind, source: TrackSource, rtp: Arc<TrackLocalStaticSample>) -> Self {
        Self {
            id: rtp.id().to_owned(),
            kind,
            source,
            rtp,
        }
    }

    /// Creates an empty sample track with the default codec for `kind`. The
    /// capture pipeline writes into [`LocalTrack::sample_track`].
    pub fn capture(kind: MediaKind, source: TrackSource) -> Self {
        let id = format!("{kind}-{}", Uuid::new_v4());
        let rtp = Arc::new(TrackLocalStaticSample::new(
            codec_for(kind),
            id,
            LOCAL_STREAM_ID.to_owned(),
        ));
        Self::new(kind, source, rtp)
    }

    pub fn placeholder(kind: MediaKind) -> Self {
        Self::capture(kind, TrackSource::Placeholder)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == TrackSource::Placeholder
    }

    pub fn sample_track(&self) -> Arc<TrackLocalStaticSample> {
        self.rtp.clone()
    }

    pub fn rtp_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.rtp.clone()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("source", &self.source)
            .finish()
    }
}

fn codec_for(kind: MediaKind) -> RTCRtpCodecCapability {
    match kind {
        MediaKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
            rtcp_feedback: vec![],
        },
        MediaKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            channels: 0,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        },
    }
}
