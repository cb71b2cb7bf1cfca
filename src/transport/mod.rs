//! Session transport abstraction
//!
//! The real-time media service (signalling, negotiation, fan-out) sits
//! behind [`SessionTransport`]. The controller only needs to establish a
//! session, publish local tracks, toggle upstream publishing and read the
//! membership view; everything else is the service's business.
//!
//! Events are delivered through an [`EventSink`] that the caller hands to
//! [`SessionTransport::establish`], so observers exist before the handshake
//! begins and no event can be emitted into the void.

pub mod loopback;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::media::{MediaTrack, TrackKind};

pub use loopback::{LoopbackHub, LOOPBACK_ENDPOINT};

/// A session member as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// Server-assigned participant SID
    pub sid: String,

    /// Identity carried by the participant's access token
    pub identity: String,

    pub joined_at: DateTime<Utc>,
}

/// What a published track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Microphone,
    ScreenShareAudio,
}

/// Options attached to a publish request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub name: String,
    pub source: TrackSource,
}

/// A local track accepted by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPublication {
    pub sid: String,
    pub name: String,
    pub kind: TrackKind,
    pub source: TrackSource,
}

/// A track published by another participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub sid: String,
    pub name: String,
    pub kind: TrackKind,
    pub source: TrackSource,
    pub participant_sid: String,
    pub participant_identity: String,
}

/// Why the transport ended a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The server removed this participant from the room
    Removed,
    /// The room was closed on the server
    RoomClosed,
    /// The connection dropped
    ConnectionLost,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::Removed => write!(f, "removed from the room by the server"),
            EndReason::RoomClosed => write!(f, "the room was closed"),
            EndReason::ConnectionLost => write!(f, "the connection to the server was lost"),
        }
    }
}

/// Events a live session emits, in transport order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ParticipantJoined(ParticipantInfo),
    ParticipantLeft(ParticipantInfo),
    TrackAvailable(RemoteTrack),
    TrackRemoved(RemoteTrack),
    SessionEnded(EndReason),
}

pub type EventSink = mpsc::UnboundedSender<SessionEvent>;
pub type EventStream = mpsc::UnboundedReceiver<SessionEvent>;

/// Connects to the real-time media service
#[async_trait::async_trait]
pub trait SessionTransport: Send + Sync {
    /// Perform the handshake for `token` against `endpoint`
    ///
    /// `events` must be wired to the session before any membership is
    /// published, so the first event the caller can miss is none.
    async fn establish(
        &self,
        endpoint: &str,
        token: &str,
        events: EventSink,
    ) -> Result<Arc<dyn SessionHandle>, TransportError>;

    /// Transport name for logging
    fn name(&self) -> &str;
}

/// A live session
#[async_trait::async_trait]
pub trait SessionHandle: Send + Sync {
    fn room_name(&self) -> String;

    fn local_participant(&self) -> ParticipantInfo;

    /// Remote members in the order the transport reports them
    fn remote_participants(&self) -> Vec<ParticipantInfo>;

    async fn publish(
        &self,
        track: &MediaTrack,
        options: PublishOptions,
    ) -> Result<TrackPublication, TransportError>;

    async fn unpublish(&self, track_sid: &str) -> Result<(), TransportError>;

    /// Start or stop sending a published track upstream
    async fn set_publishing(&self, track_sid: &str, enabled: bool) -> Result<(), TransportError>;

    /// Leave the session; further calls are no-ops
    fn teardown(&self);
}
