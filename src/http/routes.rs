use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Room control
        .route("/room/join", post(handlers::join_room))
        .route("/room/leave", post(handlers::leave_room))
        .route("/room/mute", post(handlers::toggle_mute))
        // Room queries
        .route("/room/status", get(handlers::get_status))
        .route("/room/participants", get(handlers::get_participants))
        // Browser shells call from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
