// Integration tests for muting local audio

mod common;

use audio_room::media::ShareResponse;
use audio_room::{CaptureSourceMode, RoomUpdate};
use common::*;

#[tokio::test]
async fn test_microphone_mute_stops_sending() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    let sid = alice
        .controller
        .local_capture()
        .unwrap()
        .publication()
        .sid
        .clone();
    assert_eq!(hub.is_sending(ROOM, &sid), Some(true));

    assert!(alice.controller.toggle_mute().await);
    assert!(alice.controller.is_muted());
    assert_eq!(hub.is_sending(ROOM, &sid), Some(false));

    assert!(!alice.controller.toggle_mute().await);
    assert!(!alice.controller.is_muted());
    assert_eq!(hub.is_sending(ROOM, &sid), Some(true));
}

#[tokio::test]
async fn test_system_audio_mute_disables_track_only() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::SystemAudio).await;
    let capture = alice.controller.local_capture().unwrap();
    let track = capture.audio_track().clone();
    let sid = capture.publication().sid.clone();

    assert!(alice.controller.toggle_mute().await);
    assert!(!track.is_enabled());
    assert!(track.is_live(), "the share is kept while muted");
    assert_eq!(hub.is_sending(ROOM, &sid), Some(true));

    assert!(!alice.controller.toggle_mute().await);
    assert!(track.is_enabled());
    assert_eq!(alice.devices.request_count(), 1, "unmute never re-prompts");
}

#[tokio::test]
async fn test_mute_announces_changes() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    let mut updates = alice.controller.subscribe();

    alice.controller.toggle_mute().await;
    alice.controller.toggle_mute().await;

    let states: Vec<bool> = drain(&mut updates)
        .into_iter()
        .filter_map(|u| match u {
            RoomUpdate::MuteChanged { muted } => Some(muted),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![true, false]);
}

#[tokio::test]
async fn test_toggle_without_capture_is_a_no_op() {
    let hub = hub();
    let mut alice = participant(&hub, "alice");

    // Not connected
    assert!(!alice.controller.toggle_mute().await);

    // Connected, but the share came back without audio
    alice.devices.set_share_response(ShareResponse::VideoOnly);
    let _ = alice
        .controller
        .join(&request(&hub, "alice", CaptureSourceMode::SystemAudio))
        .await;
    let mut updates = alice.controller.subscribe();

    assert!(!alice.controller.toggle_mute().await);
    assert!(!alice.controller.is_muted());
    assert!(drain(&mut updates).is_empty());
}

#[tokio::test]
async fn test_new_capture_starts_unmuted() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    assert!(alice.controller.toggle_mute().await);

    alice.controller.acquire().await.unwrap();

    assert!(!alice.controller.is_muted());
    let sid = alice
        .controller
        .local_capture()
        .unwrap()
        .publication()
        .sid
        .clone();
    assert_eq!(hub.is_sending(ROOM, &sid), Some(true));
}

#[tokio::test]
async fn test_disconnect_clears_mute() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    alice.controller.toggle_mute().await;

    alice.controller.disconnect();

    assert!(!alice.controller.is_muted());
    assert!(!alice.controller.status().muted);
}

#[tokio::test]
async fn test_failed_reacquire_clears_mute() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::SystemAudio).await;
    assert!(alice.controller.toggle_mute().await);
    let mut updates = alice.controller.subscribe();

    alice.devices.set_share_response(ShareResponse::VideoOnly);
    assert!(alice.controller.acquire().await.is_err());

    let status = alice.controller.status();
    assert!(!status.publishing);
    assert!(!status.muted, "nothing captured, nothing muted");
    assert!(alice.controller.local_capture().is_none());

    let mutes: Vec<bool> = drain(&mut updates)
        .into_iter()
        .filter_map(|u| match u {
            RoomUpdate::MuteChanged { muted } => Some(muted),
            _ => None,
        })
        .collect();
    assert_eq!(mutes, vec![false]);

    // Toggling without a capture stays a no-op
    assert!(!alice.controller.toggle_mute().await);
    assert!(!alice.controller.is_muted());
}
