use super::state::AppState;
use crate::error::ErrorKind;
use crate::room::{CaptureSourceMode, JoinOutcome, JoinRequest, RoomStatus, ServiceError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    /// Session server URL (defaults to the configured one)
    pub server_url: Option<String>,

    // Missing fields deserialize as empty so validation reports them
    #[serde(default)]
    pub room_name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub token: String,

    /// "system" or "microphone" (default: "system")
    #[serde(default)]
    pub source: CaptureSourceMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub outcome: JoinOutcome,
    pub status: RoomStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MuteResponse {
    pub muted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: Option<ErrorKind>,
}

fn error_response(err: ServiceError) -> Response {
    let (status, kind) = match &err {
        ServiceError::Room(room_err) => {
            let status = match room_err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Connection => StatusCode::BAD_GATEWAY,
                ErrorKind::Capture => StatusCode::CONFLICT,
                ErrorKind::TransportFault => StatusCode::SERVICE_UNAVAILABLE,
            };
            (status, Some(room_err.kind()))
        }
        ServiceError::Stopped => (StatusCode::SERVICE_UNAVAILABLE, None),
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind,
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /room/join
/// Join a room and publish local audio
pub async fn join_room(
    State(state): State<AppState>,
    Json(req): Json<JoinRoomRequest>,
) -> Response {
    let request = JoinRequest {
        server_url: req
            .server_url
            .unwrap_or_else(|| state.default_server_url.clone()),
        room_name: req.room_name,
        display_name: req.display_name,
        token: req.token,
        source: req.source,
    };

    info!(
        "Join requested for room {} ({})",
        request.room_name, request.source
    );

    let outcome = match state.room.join(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Join failed: {}", e);
            return error_response(e);
        }
    };

    match state.room.status().await {
        Ok(status) => (StatusCode::OK, Json(JoinRoomResponse { outcome, status })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /room/leave
/// Leave the current room (no-op when not in one)
pub async fn leave_room(State(state): State<AppState>) -> Response {
    if let Err(e) = state.room.leave().await {
        return error_response(e);
    }

    match state.room.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /room/mute
/// Toggle mute on the local audio
pub async fn toggle_mute(State(state): State<AppState>) -> Response {
    match state.room.toggle_mute().await {
        Ok(muted) => (StatusCode::OK, Json(MuteResponse { muted })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /room/status
pub async fn get_status(State(state): State<AppState>) -> Response {
    match state.room.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /room/participants
/// Participant names as rendered, local participant first
pub async fn get_participants(State(state): State<AppState>) -> Response {
    match state.room.status().await {
        Ok(status) => (StatusCode::OK, Json(status.labels)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
