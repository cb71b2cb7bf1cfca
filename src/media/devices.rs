use serde::{Deserialize, Serialize};

use super::track::{MediaStream, MediaTrack};
use crate::error::DeviceError;

/// Audio processing constraints for a capture request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    /// Requested sample rate in Hz (platform default if unset)
    pub sample_rate: Option<u32>,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self::microphone()
    }
}

impl AudioConstraints {
    /// Voice capture: let the platform clean up the signal
    pub fn microphone() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            sample_rate: None,
        }
    }

    /// Music/system capture: untouched signal at 48kHz
    pub fn system_audio() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
            sample_rate: Some(48000),
        }
    }
}

/// Ideal video shape for a display-share request
///
/// Some platforms refuse audio-only display capture, so the smallest
/// possible video channel is requested and stopped right away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            frame_rate: 1,
        }
    }
}

/// Constraints for a screen/tab share that carries audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayMediaConstraints {
    pub video: VideoConstraints,
    pub audio: AudioConstraints,
}

impl Default for DisplayMediaConstraints {
    fn default() -> Self {
        Self {
            video: VideoConstraints::default(),
            audio: AudioConstraints::system_audio(),
        }
    }
}

/// Platform media-capture collaborator
///
/// Implementations:
/// - Browser/desktop shells: wrap the platform's device and display-share APIs
/// - [`SimulatedDevices`](super::SimulatedDevices): scripted responses for tests and demos
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a microphone-only audio track
    async fn request_microphone(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<MediaTrack, DeviceError>;

    /// Request a screen/tab share with an audio channel
    ///
    /// The returned stream may lack an audio track when the user did not
    /// tick the audio-sharing option; callers must check.
    async fn request_display_media(
        &self,
        constraints: &DisplayMediaConstraints,
    ) -> Result<MediaStream, DeviceError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
