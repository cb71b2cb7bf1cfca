use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::media::{AudioConstraints, DisplayMediaConstraints, VideoConstraints};
use crate::room::{CaptureSettings, RoomOptions};
use crate::transport::LOOPBACK_ENDPOINT;

/// Environment variable prefix, e.g. `AUDIO_ROOM__ROOM__MAX_PARTICIPANTS=2`
pub const ENV_PREFIX: &str = "AUDIO_ROOM";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub room: RoomConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "audio-room".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Server URL pre-filled in join requests that leave it out
    pub default_server_url: String,

    /// Maximum room size; unlimited when unset
    pub max_participants: Option<usize>,

    pub connect_timeout_secs: u64,

    /// Endpoint served by the in-process hub
    pub loopback_endpoint: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_server_url: "wss://your-livekit-server.com".to_string(),
            max_participants: None,
            connect_timeout_secs: 15,
            loopback_endpoint: LOOPBACK_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub microphone: AudioConstraints,
    pub system_audio: AudioConstraints,
    /// Placeholder video requested alongside system audio
    pub display_video: VideoConstraints,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            microphone: AudioConstraints::microphone(),
            system_audio: AudioConstraints::system_audio(),
            display_video: VideoConstraints::default(),
        }
    }
}

impl Config {
    /// Load `path` (any extension the `config` crate knows, optional) with
    /// `AUDIO_ROOM__*` environment overrides on top
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn room_options(&self) -> RoomOptions {
        RoomOptions {
            max_participants: self.room.max_participants,
            connect_timeout: Duration::from_secs(self.room.connect_timeout_secs),
        }
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            microphone: self.capture.microphone.clone(),
            system_audio: DisplayMediaConstraints {
                video: self.capture.display_video.clone(),
                audio: self.capture.system_audio.clone(),
            },
        }
    }
}
