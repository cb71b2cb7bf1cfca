use crate::room::RoomServiceHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The room this shell controls
    pub room: RoomServiceHandle,

    /// Filled into join requests that omit the server URL
    pub default_server_url: String,
}

impl AppState {
    pub fn new(room: RoomServiceHandle, default_server_url: impl Into<String>) -> Self {
        Self {
            room,
            default_server_url: default_server_url.into(),
        }
    }
}
