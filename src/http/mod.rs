//! HTTP control shell for a single room
//!
//! This module provides a REST API over a `RoomService`:
//! - POST /room/join - Join a room and start publishing audio
//! - POST /room/leave - Leave the room
//! - POST /room/mute - Toggle mute
//! - GET /room/status - Query connection status
//! - GET /room/participants - Get the participant list
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, JoinRoomRequest, JoinRoomResponse, MuteResponse};
pub use routes::create_router;
pub use state::AppState;
