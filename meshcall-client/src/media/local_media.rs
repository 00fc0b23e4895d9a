use crate::media::LocalTrack;
use meshcall_core::MediaKind;
use tokio::sync::watch;
use tracing::{info, warn};

/// Current outgoing media: one track per kind plus capability flags.
#[derive(Debug, Clone)]
pub struct MediaBundle {
    pub audio: LocalTrack,
    pub video: LocalTrack,
    pub video_enabled: bool,
    pub audio_enabled: bool,
    pub screen_sharing: bool,
    pub video_available: bool,
    pub audio_available: bool,
}

impl MediaBundle {
    pub fn track(&self, kind: MediaKind) -> &LocalTrack {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }

    pub fn tracks(&self) -> [&LocalTrack; 2] {
        [&self.audio, &self.video]
    }
}

/// Owner of the local devices. Every mutation publishes a fresh bundle to the
/// subscribers (the mesh task among them).
pub struct LocalMedia {
    camera: Option<LocalTrack>,
    microphone: Option<LocalTrack>,
    screen_video: Option<LocalTrack>,
    screen_audio: Option<LocalTrack>,
    silence: LocalTrack,
    black: LocalTrack,
    video_enabled: bool,
    audio_enabled: bool,
    video_permitted: bool,
    audio_permitted: bool,
    tx: watch::Sender<MediaBundle>,
}

impl LocalMedia {
    /// `None` for a device means it could not be acquired (missing permission
    /// or hardware); the call continues on placeholders.
    pub fn new(camera: Option<LocalTrack>, microphone: Option<LocalTrack>) -> Self {
        let silence = LocalTrack::placeholder(MediaKind::Audio);
        let black = LocalTrack::placeholder(MediaKind::Video);
        let initial = MediaBundle {
            audio: silence.clone(),
            video: black.clone(),
            video_enabled: false,
            audio_enabled: false,
            screen_sharing: false,
            video_available: false,
            audio_available: false,
        };
        let (tx, _rx) = watch::channel(initial);

        let media = Self {
            camera,
            microphone,
            screen_video: None,
            screen_audio: None,
            silence,
            black,
            video_enabled: true,
            audio_enabled: true,
            video_permitted: true,
            audio_permitted: true,
            tx,
        };
        media.publish();
        media
    }

    /// Placeholders only, for participants joining without devices.
    pub fn without_devices() -> Self {
        Self::new(None, None)
    }

    pub fn current_bundle(&self) -> MediaBundle {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MediaBundle> {
        self.tx.subscribe()
    }

    pub fn set_video(&mut self, enabled: bool) {
        self.video_enabled = enabled;
        self.publish();
    }

    pub fn set_audio(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
        self.publish();
    }

    pub fn set_camera(&mut self, camera: Option<LocalTrack>) {
        self.camera = camera;
        self.publish();
    }

    pub fn set_microphone(&mut self, microphone: Option<LocalTrack>) {
        self.microphone = microphone;
        self.publish();
    }

    /// Reports device acquisition results. An unavailable device keeps its
    /// placeholder no matter what the toggle says.
    pub fn set_device_availability(&mut self, video: bool, audio: bool) {
        if !video || !audio {
            warn!(video, audio, "local devices unavailable, continuing with placeholders");
        }
        self.video_permitted = video;
        self.audio_permitted = audio;
        self.publish();
    }

    pub fn start_screen_share(&mut self, video: LocalTrack, audio: Option<LocalTrack>) {
        if video.kind() != MediaKind::Video {
            warn!(track = %video.id(), "screen share needs a video track; ignoring");
            return;
        }
        self.screen_video = Some(video);
        self.screen_audio = audio.filter(|t| t.kind() == MediaKind::Audio);
        self.publish();
    }

    pub fn stop_screen_share(&mut self) {
        if self.screen_video.take().is_none() {
            return;
        }
        self.screen_audio = None;
        self.publish();
    }

    /// The platform ended the capture (user hit "stop sharing" in the browser
    /// bar, window closed). Falls back to camera media.
    pub fn screen_share_ended(&mut self) {
        info!("screen capture ended by the platform, falling back to camera");
        self.stop_screen_share();
    }

    /// Releases every device track; peers keep receiving placeholders until
    /// their handles are closed.
    pub fn end_call(&mut self) {
        self.camera = None;
        self.microphone = None;
        self.screen_video = None;
        self.screen_audio = None;
        self.publish();
    }

    fn publish(&self) {
        let bundle = self.compose();
        self.tx.send_replace(bundle);
    }

    fn compose(&self) -> MediaBundle {
        let screen_sharing = self.screen_video.is_some();

        let camera = self.camera.as_ref().filter(|_| self.video_permitted);
        let microphone = self.microphone.as_ref().filter(|_| self.audio_permitted);

        let video = match (&self.screen_video, camera) {
            (Some(screen), _) => screen.clone(),
            (None, Some(camera)) if self.video_enabled => camera.clone(),
            _ => self.black.clone(),
        };

        let audio = match (&self.screen_audio, microphone) {
            (Some(screen), _) => screen.clone(),
            (None, Some(mic)) if self.audio_enabled => mic.clone(),
            _ => self.silence.clone(),
        };

        MediaBundle {
            audio,
            video,
            video_enabled: self.video_enabled,
            audio_enabled: self.audio_enabled,
            screen_sharing,
            video_available: camera.is_some(),
            audio_available: microphone.is_some(),
        }
    }
}
