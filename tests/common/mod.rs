// Shared fixtures for controller integration tests
#![allow(dead_code)]

use audio_room::room::{CaptureSettings, RoomOptions};
use audio_room::{
    CaptureSourceMode, JoinRequest, LoopbackHub, RoomController, RoomUpdate, SimulatedDevices,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const ROOM: &str = "demo";

pub struct Participant {
    pub name: String,
    pub devices: Arc<SimulatedDevices>,
    pub controller: RoomController,
}

pub fn hub() -> LoopbackHub {
    LoopbackHub::default()
}

pub fn participant(hub: &LoopbackHub, name: &str) -> Participant {
    participant_with(hub, name, RoomOptions::default())
}

pub fn participant_with(hub: &LoopbackHub, name: &str, options: RoomOptions) -> Participant {
    let devices = Arc::new(SimulatedDevices::new());
    let controller = RoomController::new(
        Arc::new(hub.clone()),
        devices.clone(),
        CaptureSettings::default(),
        options,
    );
    Participant {
        name: name.to_string(),
        devices,
        controller,
    }
}

pub fn request(hub: &LoopbackHub, name: &str, source: CaptureSourceMode) -> JoinRequest {
    JoinRequest {
        server_url: hub.endpoint().to_string(),
        room_name: ROOM.to_string(),
        display_name: name.to_string(),
        token: hub.issue_token(ROOM, name),
        source,
    }
}

/// Join `name` to the demo room and return it connected
pub async fn joined(hub: &LoopbackHub, name: &str, source: CaptureSourceMode) -> Participant {
    let mut p = participant(hub, name);
    p.controller
        .join(&request(hub, name, source))
        .await
        .expect("join should succeed");
    p
}

pub fn short_timeout() -> RoomOptions {
    RoomOptions {
        max_participants: None,
        connect_timeout: Duration::from_millis(50),
    }
}

/// Drain every update currently buffered for `rx`
pub fn drain(rx: &mut broadcast::Receiver<RoomUpdate>) -> Vec<RoomUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

pub fn names(controller: &RoomController) -> Vec<String> {
    controller
        .participants()
        .iter()
        .map(|p| p.display_name.clone())
        .collect()
}
