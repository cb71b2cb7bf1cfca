// Scripted media devices
//
// Stands in for the platform capture APIs so the controller can be driven
// end to end without real hardware or permission prompts. Every track it
// hands out is remembered so tests can assert nothing is left running.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::devices::{AudioConstraints, DisplayMediaConstraints, MediaDevices};
use super::track::{MediaStream, MediaTrack, TrackKind};
use crate::error::DeviceError;

/// How the simulated user answers a microphone prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophoneResponse {
    Grant,
    Deny,
    /// No input device present
    Missing,
}

/// How the simulated user answers a screen/tab share prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareResponse {
    /// Shares a tab with "Share tab audio" ticked
    WithAudio,
    /// Shares a tab but leaves audio sharing off
    VideoOnly,
    Deny,
    /// Closes the picker without choosing
    Cancel,
}

#[derive(Debug)]
struct Script {
    microphone: MicrophoneResponse,
    share: ShareResponse,
}

#[derive(Debug)]
pub struct SimulatedDevices {
    script: Mutex<Script>,
    issued: Mutex<Vec<MediaTrack>>,
    requests: AtomicUsize,
}

impl Default for SimulatedDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevices {
    /// Devices that grant every request
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                microphone: MicrophoneResponse::Grant,
                share: ShareResponse::WithAudio,
            }),
            issued: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn set_microphone_response(&self, response: MicrophoneResponse) {
        lock(&self.script).microphone = response;
    }

    pub fn set_share_response(&self, response: ShareResponse) {
        lock(&self.script).share = response;
    }

    /// Every track handed out so far
    pub fn issued_tracks(&self) -> Vec<MediaTrack> {
        lock(&self.issued).clone()
    }

    /// Tracks handed out that nobody has stopped yet
    pub fn live_tracks(&self) -> Vec<MediaTrack> {
        lock(&self.issued)
            .iter()
            .filter(|t| t.is_live())
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn issue(&self, kind: TrackKind, label: &str) -> MediaTrack {
        let track = MediaTrack::new(kind, label);
        lock(&self.issued).push(track.clone());
        track
    }
}

#[async_trait::async_trait]
impl MediaDevices for SimulatedDevices {
    async fn request_microphone(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<MediaTrack, DeviceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!("Simulated microphone request ({:?})", constraints);

        let response = lock(&self.script).microphone;
        match response {
            MicrophoneResponse::Grant => Ok(self.issue(TrackKind::Audio, "Simulated Microphone")),
            MicrophoneResponse::Deny => Err(DeviceError::PermissionDenied(
                "microphone access was blocked".to_string(),
            )),
            MicrophoneResponse::Missing => Err(DeviceError::NotFound(
                "no audio input device".to_string(),
            )),
        }
    }

    async fn request_display_media(
        &self,
        constraints: &DisplayMediaConstraints,
    ) -> Result<MediaStream, DeviceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Simulated display share request (video {}x{}@{}fps)",
            constraints.video.width, constraints.video.height, constraints.video.frame_rate
        );

        let response = lock(&self.script).share;
        match response {
            ShareResponse::WithAudio => {
                let video = self.issue(TrackKind::Video, "Simulated Tab");
                let audio = self.issue(TrackKind::Audio, "Simulated Tab Audio");
                Ok(MediaStream::new(vec![video, audio]))
            }
            ShareResponse::VideoOnly => {
                let video = self.issue(TrackKind::Video, "Simulated Tab");
                Ok(MediaStream::new(vec![video]))
            }
            ShareResponse::Deny => Err(DeviceError::PermissionDenied(
                "screen sharing was blocked".to_string(),
            )),
            ShareResponse::Cancel => Err(DeviceError::Aborted(
                "the share picker was closed".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
