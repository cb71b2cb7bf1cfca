use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug)]
struct TrackState {
    enabled: AtomicBool,
    stopped: AtomicBool,
}

/// A captured media track
///
/// Clones share state: stopping or disabling one clone is visible through
/// every other, so the capture layer and the transport always agree on
/// whether the underlying device is still live.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    label: String,
    state: Arc<TrackState>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            state: Arc::new(TrackState {
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the track currently produces audible/visible output
    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Stop the track and release its device
    ///
    /// Returns `true` if this call performed the stop.
    pub fn stop(&self) -> bool {
        !self.state.stopped.swap(true, Ordering::SeqCst)
    }

    pub fn is_live(&self) -> bool {
        !self.state.stopped.load(Ordering::SeqCst)
    }
}

/// Tracks returned by a single capture request
#[derive(Debug, Clone, Default)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    /// Stop every track, returning how many were still live
    pub fn stop_all(&self) -> usize {
        self.tracks.iter().filter(|t| t.stop()).count()
    }

    pub fn into_tracks(self) -> Vec<MediaTrack> {
        self.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_stop_and_enabled_state() {
        let track = MediaTrack::new(TrackKind::Audio, "mic");
        let clone = track.clone();

        clone.set_enabled(false);
        assert!(!track.is_enabled());

        assert!(track.stop());
        assert!(!clone.is_live());
        assert!(!clone.stop(), "second stop is a no-op");
    }

    #[test]
    fn stop_all_counts_only_live_tracks() {
        let audio = MediaTrack::new(TrackKind::Audio, "tab audio");
        let video = MediaTrack::new(TrackKind::Video, "tab");
        video.stop();

        let stream = MediaStream::new(vec![audio.clone(), video]);
        assert_eq!(stream.audio_tracks().count(), 1);
        assert_eq!(stream.stop_all(), 1);
        assert!(!audio.is_live());
    }
}
