use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::join::CaptureSourceMode;
use super::roster::ParticipantRecord;
use crate::error::ErrorReport;
use crate::transport::RemoteTrack;

/// Connection lifecycle, which decides whether join or in-room controls apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Notification pushed to controller listeners
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomUpdate {
    StateChanged { state: ConnectionState },
    RosterChanged { participants: Vec<ParticipantRecord> },
    MuteChanged { muted: bool },
    /// A remote audio track is ready for playback
    AudioAttached { track: RemoteTrack },
    AudioDetached { track_sid: String },
    Failed { report: ErrorReport },
}

/// Snapshot of the controller for shells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStatus {
    pub state: ConnectionState,

    /// Room the session is in, if any
    pub room_name: Option<String>,

    pub display_name: Option<String>,

    pub source: Option<CaptureSourceMode>,

    /// Whether a local track is published
    pub publishing: bool,

    pub muted: bool,

    pub participants: Vec<ParticipantRecord>,

    /// Participant names as rendered, local entry marked
    pub labels: Vec<String>,

    /// Heading for the participant list
    pub summary: String,

    /// Remote audio tracks currently attached
    pub remote_audio_tracks: usize,

    pub connected_at: Option<DateTime<Utc>>,

    /// Session duration so far in seconds
    pub duration_secs: f64,

    /// Most recent failure, cleared when the next connect attempt starts
    pub last_error: Option<ErrorReport>,
}
