//! Session lifecycle controller
//!
//! This module provides the `RoomController` abstraction that manages:
//! - Connecting to and leaving a real-time audio room
//! - Capturing and publishing microphone or system audio
//! - Deriving the participant roster from membership events
//! - Muting with source-specific semantics
//!
//! `RoomService` wraps a controller in a task so several callers can share it.

mod capture;
mod controller;
mod join;
pub mod mute;
mod roster;
mod service;
mod status;

pub use capture::{CaptureManager, CaptureSettings, LocalCapture};
pub use controller::{LeaveSignal, RoomController, RoomOptions};
pub use join::{CaptureSourceMode, JoinOutcome, JoinRequest};
pub use roster::{refresh, ParticipantRecord, Roster};
pub use service::{RoomService, RoomServiceHandle, ServiceError};
pub use status::{ConnectionState, RoomStatus, RoomUpdate};
