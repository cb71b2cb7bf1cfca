// Local audio capture and publishing
//
// Two strategies, chosen by CaptureSourceMode:
// - Microphone: a single audio track from the input device
// - SystemAudio: a tab/screen share; its placeholder video track is stopped
//   immediately and only the audio track is published
//
// Whatever happens, every track a request returned is either owned by the
// resulting LocalCapture or stopped before returning.

use std::sync::Arc;
use tracing::{info, warn};

use super::join::CaptureSourceMode;
use crate::error::CaptureError;
use crate::media::{AudioConstraints, DisplayMediaConstraints, MediaDevices, MediaTrack};
use crate::transport::{PublishOptions, SessionHandle, TrackPublication, TrackSource};

/// Constraints used for each capture strategy
#[derive(Debug, Clone, Default)]
pub struct CaptureSettings {
    pub microphone: AudioConstraints,
    pub system_audio: DisplayMediaConstraints,
}

/// The published local audio source
#[derive(Debug)]
pub struct LocalCapture {
    mode: CaptureSourceMode,
    audio: MediaTrack,
    /// Every track the capture request returned, including stopped video
    tracks: Vec<MediaTrack>,
    publication: TrackPublication,
}

impl LocalCapture {
    pub fn mode(&self) -> CaptureSourceMode {
        self.mode
    }

    pub fn audio_track(&self) -> &MediaTrack {
        &self.audio
    }

    pub fn publication(&self) -> &TrackPublication {
        &self.publication
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// Whether any underlying track still holds a device
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| t.is_live())
    }

    fn stop_all(&self) -> usize {
        self.tracks.iter().filter(|t| t.stop()).count()
    }
}

impl Drop for LocalCapture {
    fn drop(&mut self) {
        let stopped = self.stop_all();
        if stopped > 0 {
            warn!("Local capture dropped without release; stopped {} tracks", stopped);
        }
    }
}

/// Acquires and releases local audio
pub struct CaptureManager {
    devices: Arc<dyn MediaDevices>,
    settings: CaptureSettings,
}

impl CaptureManager {
    pub fn new(devices: Arc<dyn MediaDevices>, settings: CaptureSettings) -> Self {
        Self { devices, settings }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Capture audio for `mode` and publish it on `handle`
    ///
    /// Must only be called on a live session.
    pub async fn acquire(
        &self,
        mode: CaptureSourceMode,
        handle: &dyn SessionHandle,
    ) -> Result<LocalCapture, CaptureError> {
        info!("Acquiring {} via {} devices", mode, self.devices.name());

        let (audio, tracks, options) = match mode {
            CaptureSourceMode::Microphone => self.capture_microphone().await?,
            CaptureSourceMode::SystemAudio => self.capture_system_audio().await?,
        };

        match handle.publish(&audio, options).await {
            Ok(publication) => {
                info!(
                    "Published {} as {} ({:?})",
                    audio.label(),
                    publication.sid,
                    publication.source
                );
                Ok(LocalCapture {
                    mode,
                    audio,
                    tracks,
                    publication,
                })
            }
            Err(e) => {
                for track in &tracks {
                    track.stop();
                }
                Err(CaptureError::Publish(e))
            }
        }
    }

    /// Unpublish (when the session is still live) and stop every track
    pub async fn release(&self, capture: LocalCapture, handle: Option<&dyn SessionHandle>) {
        if let Some(handle) = handle {
            if let Err(e) = handle.unpublish(&capture.publication.sid).await {
                warn!("Failed to unpublish {}: {}", capture.publication.sid, e);
            }
        }
        Self::stop(capture);
    }

    /// Stop every track without talking to the transport
    pub fn stop(capture: LocalCapture) {
        let stopped = capture.stop_all();
        info!(
            "Released {} capture ({} tracks stopped)",
            capture.mode, stopped
        );
    }

    async fn capture_microphone(
        &self,
    ) -> Result<(MediaTrack, Vec<MediaTrack>, PublishOptions), CaptureError> {
        let track = self
            .devices
            .request_microphone(&self.settings.microphone)
            .await?;

        let options = PublishOptions {
            name: "microphone".to_string(),
            source: TrackSource::Microphone,
        };
        Ok((track.clone(), vec![track], options))
    }

    async fn capture_system_audio(
        &self,
    ) -> Result<(MediaTrack, Vec<MediaTrack>, PublishOptions), CaptureError> {
        let stream = self
            .devices
            .request_display_media(&self.settings.system_audio)
            .await?;

        // Video only satisfied the share API; it is never published
        for video in stream.video_tracks() {
            video.stop();
        }

        let Some(audio) = stream.audio_tracks().next().cloned() else {
            stream.stop_all();
            warn!("Display share returned no audio track");
            return Err(CaptureError::NoAudioTrack);
        };

        let options = PublishOptions {
            name: "system-audio".to_string(),
            source: TrackSource::ScreenShareAudio,
        };
        Ok((audio, stream.into_tracks(), options))
    }
}
