use crate::MeshError;
use crate::transport::TransportConfig;
use meshcall_core::IceServerConfig;
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_NEGOTIATION_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CHAT_LABEL: &str = "chat";

/// Settings for one call.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MeshConfig {
    pub signaling_url: String,
    pub room: String,
    /// Name written into outgoing chat messages.
    pub display_name: String,
    pub transport: TransportConfig,
    /// 0 disables the timeout.
    pub negotiation_timeout_ms: u64,
    pub chat_label: String,
    pub chat_open_on_start: bool,
    /// Capacity of the internal event and command channels.
    pub event_buffer: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://127.0.0.1:8000".to_owned(),
            room: "lobby".to_owned(),
            display_name: "guest".to_owned(),
            transport: TransportConfig::default(),
            negotiation_timeout_ms: DEFAULT_NEGOTIATION_TIMEOUT_MS,
            chat_label: DEFAULT_CHAT_LABEL.to_owned(),
            chat_open_on_start: false,
            event_buffer: 256,
        }
    }
}

impl MeshConfig {
    pub fn new(
        signaling_url: impl Into<String>,
        room: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            room: room.into(),
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        (self.negotiation_timeout_ms > 0).then(|| Duration::from_millis(self.negotiation_timeout_ms))
    }

    /// Overrides the ICE servers and the timeout from `MESHCALL_*` variables.
    pub fn from_env(self) -> Result<Self, MeshError> {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, MeshError> {
        if let Some(urls) = lookup("MESHCALL_ICE_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_owned)
                .collect();
            if urls.is_empty() {
                return Err(MeshError::Config("MESHCALL_ICE_URLS is empty".into()));
            }
            self.transport.ice_servers = vec![IceServerConfig {
                urls,
                username: lookup("MESHCALL_ICE_USERNAME"),
                credential: lookup("MESHCALL_ICE_CREDENTIAL"),
            }];
        }

        if let Some(raw) = lookup("MESHCALL_NEGOTIATION_TIMEOUT_MS") {
            self.negotiation_timeout_ms = raw.trim().parse().map_err(|e| {
                MeshError::Config(format!("MESHCALL_NEGOTIATION_TIMEOUT_MS={raw:?}: {e}"))
            })?;
        }

        if self.event_buffer == 0 {
            return Err(MeshError::Config("event_buffer must be positive".into()));
        }
        Ok(self)
    }
}
