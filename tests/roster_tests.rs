// Integration tests for the participant roster and remote audio

mod common;

use audio_room::room::{refresh, RoomOptions};
use audio_room::transport::SessionTransport;
use audio_room::{CaptureSourceMode, LoopbackHub, RoomUpdate, TrackKind};
use common::*;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_two_participants_each_see_themselves_first() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    let mut bob = joined(&hub, "bob", CaptureSourceMode::Microphone).await;

    alice.controller.process_pending_events();
    bob.controller.process_pending_events();

    assert_eq!(alice.controller.roster().labels(), vec!["alice (You)", "bob"]);
    assert_eq!(bob.controller.roster().labels(), vec!["bob (You)", "alice"]);
    assert_eq!(alice.controller.roster().summary(), "Participants (2)");
}

#[tokio::test]
async fn test_roster_tracks_joins_and_leaves() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;

    let mut others = Vec::new();
    for name in ["bob", "carol", "dave"] {
        others.push(joined(&hub, name, CaptureSourceMode::Microphone).await);
    }
    alice.controller.process_pending_events();
    assert_eq!(alice.controller.roster().len(), 4);

    // carol and dave leave
    for mut other in others.drain(1..) {
        other.controller.disconnect();
    }
    alice.controller.process_pending_events();

    assert_eq!(names(&alice.controller), vec!["alice", "bob"]);
    assert_eq!(
        alice.controller.roster().local().map(|p| p.display_name.as_str()),
        Some("alice")
    );
}

#[tokio::test]
async fn test_roster_ids_match_session_participants() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    let _bob = joined(&hub, "bob", CaptureSourceMode::Microphone).await;
    alice.controller.process_pending_events();

    let mut ids: Vec<String> = alice
        .controller
        .participants()
        .iter()
        .map(|p| p.session_participant_id.clone())
        .collect();
    let mut expected: Vec<String> = hub.participants(ROOM).into_iter().map(|p| p.sid).collect();
    ids.sort();
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_roster_change_is_announced() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    let mut updates = alice.controller.subscribe();

    let _bob = joined(&hub, "bob", CaptureSourceMode::Microphone).await;
    alice.controller.process_pending_events();

    let rosters: Vec<usize> = drain(&mut updates)
        .into_iter()
        .filter_map(|u| match u {
            RoomUpdate::RosterChanged { participants } => Some(participants.len()),
            _ => None,
        })
        .collect();
    assert_eq!(rosters, vec![2]);
}

#[tokio::test]
async fn test_queued_joins_each_produce_a_consistent_roster() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    let mut updates = alice.controller.subscribe();

    let _bob = joined(&hub, "bob", CaptureSourceMode::Microphone).await;
    let _carol = joined(&hub, "carol", CaptureSourceMode::Microphone).await;
    alice.controller.process_pending_events();

    let rosters: Vec<Vec<String>> = drain(&mut updates)
        .into_iter()
        .filter_map(|u| match u {
            RoomUpdate::RosterChanged { participants } => Some(
                participants
                    .into_iter()
                    .map(|p| p.display_name)
                    .collect(),
            ),
            _ => None,
        })
        .collect();

    assert_eq!(rosters.len(), 2, "one snapshot per join event");
    for roster in &rosters {
        assert_eq!(roster[0], "alice");
        let mut sorted = roster.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), roster.len(), "no duplicate entries");
    }
    // Membership is read at processing time, so both show the current room
    assert_eq!(rosters[1], vec!["alice", "bob", "carol"]);
    assert_eq!(names(&alice.controller), vec!["alice", "bob", "carol"]);
}

#[tokio::test]
async fn test_summary_reflects_room_capacity() {
    let hub = hub().with_capacity(Some(2));
    let capped = RoomOptions {
        max_participants: Some(2),
        connect_timeout: Duration::from_secs(5),
    };

    let mut alice = participant_with(&hub, "alice", capped);
    alice
        .controller
        .join(&request(&hub, "alice", CaptureSourceMode::Microphone))
        .await
        .unwrap();
    assert_eq!(alice.controller.roster().summary(), "Participants (1/2)");

    let _bob = joined(&hub, "bob", CaptureSourceMode::Microphone).await;
    alice.controller.process_pending_events();

    assert_eq!(alice.controller.roster().summary(), "Participants (2/2)");
    assert!(alice.controller.roster().is_full());
}

#[tokio::test]
async fn test_refresh_lists_local_participant_first() -> anyhow::Result<()> {
    let hub = LoopbackHub::default();

    let (tx, _rx_a) = mpsc::unbounded_channel();
    let alice = hub
        .establish(hub.endpoint(), &hub.issue_token(ROOM, "alice"), tx)
        .await?;
    let (tx, _rx_b) = mpsc::unbounded_channel();
    let bob = hub
        .establish(hub.endpoint(), &hub.issue_token(ROOM, "bob"), tx)
        .await?;

    let from_bob: Vec<String> = refresh(bob.as_ref())
        .into_iter()
        .map(|p| p.display_name)
        .collect();
    assert_eq!(from_bob, vec!["bob", "alice"]);

    alice.teardown();
    assert_eq!(refresh(bob.as_ref()).len(), 1);

    bob.teardown();
    Ok(())
}

#[tokio::test]
async fn test_remote_audio_is_attached_and_detached() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    let mut bob = joined(&hub, "bob", CaptureSourceMode::SystemAudio).await;
    let mut updates = alice.controller.subscribe();

    alice.controller.process_pending_events();
    bob.controller.process_pending_events();

    let heard = alice.controller.remote_audio_tracks();
    assert_eq!(heard.len(), 1);
    assert_eq!(heard[0].participant_identity, "bob");
    assert_eq!(heard[0].kind, TrackKind::Audio);
    assert_eq!(bob.controller.remote_audio_tracks().len(), 1, "late joiner hears alice");

    bob.controller.disconnect();
    alice.controller.process_pending_events();

    assert!(alice.controller.remote_audio_tracks().is_empty());
    let updates = drain(&mut updates);
    assert!(updates
        .iter()
        .any(|u| matches!(u, RoomUpdate::AudioAttached { .. })));
    assert!(updates
        .iter()
        .any(|u| matches!(u, RoomUpdate::AudioDetached { .. })));
}

#[tokio::test]
async fn test_remote_mute_keeps_track_attached() {
    let hub = hub();
    let mut alice = joined(&hub, "alice", CaptureSourceMode::Microphone).await;
    let mut bob = joined(&hub, "bob", CaptureSourceMode::Microphone).await;

    assert!(bob.controller.toggle_mute().await);
    alice.controller.process_pending_events();

    assert_eq!(alice.controller.remote_audio_tracks().len(), 1);
}
