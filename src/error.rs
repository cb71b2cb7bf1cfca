//! Error taxonomy for the room controller
//!
//! Collaborators report failures with their own error types
//! ([`TransportError`], [`DeviceError`]). The controller folds them into a
//! [`RoomError`] at the operation boundary and turns that into an
//! [`ErrorReport`] for the shell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error as _;

/// Failures reported by a session transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("the access token was rejected: {0}")]
    AuthRejected(String),

    #[error("the access token is malformed: {0}")]
    MalformedToken(String),

    #[error("the session server is unreachable: {0}")]
    Unreachable(String),

    #[error("the room is full ({0} participants)")]
    RoomFull(usize),

    #[error("the session is not connected")]
    NotConnected,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures reported by the platform media-capture collaborator
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeviceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no capture device available: {0}")]
    NotFound(String),

    #[error("capture request aborted: {0}")]
    Aborted(String),
}

/// Failures while acquiring, publishing or muting the local capture
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(
        "No audio track found. Make sure to check 'Share audio' or 'Share tab audio' \
         in the sharing dialog."
    )]
    NoAudioTrack,

    #[error("Audio capture was not allowed ({0}). Allow access when prompted and try again.")]
    PermissionDenied(String),

    #[error("Failed to capture audio: {0}")]
    Device(#[source] DeviceError),

    #[error("Failed to publish audio: {0}")]
    Publish(#[source] TransportError),

    #[error("Not connected to a room")]
    NotConnected,
}

impl From<DeviceError> for CaptureError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::PermissionDenied(reason) => CaptureError::PermissionDenied(reason),
            other => CaptureError::Device(other),
        }
    }
}

/// Error surfaced by controller operations
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to join room: {0}")]
    Connection(#[source] TransportError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("Disconnected from room: {0}")]
    TransportFault(String),
}

/// Coarse error class, stable for shells to branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Connection,
    Capture,
    TransportFault,
}

/// User-facing message plus diagnostic detail for one failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,

    /// Single actionable sentence for the user
    pub message: String,

    /// Full source chain, for logs
    pub detail: String,

    pub at: DateTime<Utc>,
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomError::Validation(_) => ErrorKind::Validation,
            RoomError::Connection(_) => ErrorKind::Connection,
            RoomError::Capture(_) => ErrorKind::Capture,
            RoomError::TransportFault(_) => ErrorKind::TransportFault,
        }
    }

    pub fn report(&self) -> ErrorReport {
        let mut detail = format!("{:?}", self);
        let mut source = self.source();
        while let Some(cause) = source {
            detail.push_str(&format!("\ncaused by: {}", cause));
            source = cause.source();
        }

        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            detail,
            at: Utc::now(),
        }
    }
}
