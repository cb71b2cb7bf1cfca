// In-process session transport
//
// A miniature session server living in the same process: rooms, members,
// publications and event fan-out, with the same shape as a hosted service.
// Tokens are opaque to callers; the hub only accepts tokens it issued.

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use super::{
    EndReason, EventSink, ParticipantInfo, PublishOptions, RemoteTrack, SessionEvent,
    SessionHandle, SessionTransport, TrackPublication,
};
use crate::error::TransportError;
use crate::media::MediaTrack;

/// Default endpoint served by a [`LoopbackHub`]
pub const LOOPBACK_ENDPOINT: &str = "loopback://local";

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    room: String,
    identity: String,
    nonce: String,
}

struct Publication {
    info: TrackPublication,
    sending: bool,
}

struct Member {
    info: ParticipantInfo,
    events: EventSink,
    publications: Vec<Publication>,
}

impl Member {
    fn remote_track(&self, publication: &TrackPublication) -> RemoteTrack {
        RemoteTrack {
            sid: publication.sid.clone(),
            name: publication.name.clone(),
            kind: publication.kind,
            source: publication.source,
            participant_sid: self.info.sid.clone(),
            participant_identity: self.info.identity.clone(),
        }
    }

    fn notify(&self, event: SessionEvent) {
        // A closed sink means the member is already going away
        let _ = self.events.send(event);
    }
}

#[derive(Default)]
struct HubState {
    rooms: HashMap<String, Vec<Member>>,
    issued: HashSet<String>,
    capacity: Option<usize>,
    offline: bool,
    handshake_delay: Duration,
    handshakes: usize,
}

impl HubState {
    /// Remove a member, telling everyone else what went away
    fn remove_member(&mut self, room: &str, sid: &str) -> Option<Member> {
        let members = self.rooms.get_mut(room)?;
        let index = members.iter().position(|m| m.info.sid == sid)?;
        let member = members.remove(index);

        for other in members.iter() {
            for publication in &member.publications {
                other.notify(SessionEvent::TrackRemoved(member.remote_track(&publication.info)));
            }
            other.notify(SessionEvent::ParticipantLeft(member.info.clone()));
        }

        if members.is_empty() {
            self.rooms.remove(room);
        }

        Some(member)
    }
}

/// In-process session server
#[derive(Clone)]
pub struct LoopbackHub {
    endpoint: String,
    state: Arc<Mutex<HubState>>,
}

impl Default for LoopbackHub {
    fn default() -> Self {
        Self::new(LOOPBACK_ENDPOINT)
    }
}

impl LoopbackHub {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            state: Arc::new(Mutex::new(HubState::default())),
        }
    }

    /// Limit every room to `max_participants` members
    pub fn with_capacity(self, max_participants: Option<usize>) -> Self {
        self.lock().capacity = max_participants;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue an access token for `identity` in `room`
    pub fn issue_token(&self, room: &str, identity: &str) -> String {
        let claims = TokenClaims {
            room: room.to_string(),
            identity: identity.to_string(),
            nonce: uuid::Uuid::new_v4().simple().to_string(),
        };
        let json = serde_json::to_vec(&claims).unwrap_or_default();
        let token = general_purpose::URL_SAFE_NO_PAD.encode(json);

        self.lock().issued.insert(token.clone());
        token
    }

    /// Refuse every handshake as if the server were down
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Hold each handshake for `delay` before admitting the member
    pub fn set_handshake_delay(&self, delay: Duration) {
        self.lock().handshake_delay = delay;
    }

    /// Number of handshakes attempted against this hub
    pub fn handshake_count(&self) -> usize {
        self.lock().handshakes
    }

    /// Members of `room` in join order
    pub fn participants(&self, room: &str) -> Vec<ParticipantInfo> {
        self.lock()
            .rooms
            .get(room)
            .map(|members| members.iter().map(|m| m.info.clone()).collect())
            .unwrap_or_default()
    }

    /// Tracks `identity` currently publishes in `room`
    pub fn publications(&self, room: &str, identity: &str) -> Vec<TrackPublication> {
        self.lock()
            .rooms
            .get(room)
            .and_then(|members| members.iter().find(|m| m.info.identity == identity))
            .map(|m| m.publications.iter().map(|p| p.info.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether the track `track_sid` in `room` is being sent upstream
    pub fn is_sending(&self, room: &str, track_sid: &str) -> Option<bool> {
        let state = self.lock();
        state
            .rooms
            .get(room)?
            .iter()
            .flat_map(|m| m.publications.iter())
            .find(|p| p.info.sid == track_sid)
            .map(|p| p.sending)
    }

    /// Server-side removal of a participant
    pub fn remove_participant(&self, room: &str, identity: &str) -> bool {
        let mut state = self.lock();
        let sid = state
            .rooms
            .get(room)
            .and_then(|members| members.iter().find(|m| m.info.identity == identity))
            .map(|m| m.info.sid.clone());

        let Some(sid) = sid else {
            return false;
        };

        match state.remove_member(room, &sid) {
            Some(member) => {
                info!("Removed {} from room {}", identity, room);
                member.notify(SessionEvent::SessionEnded(EndReason::Removed));
                true
            }
            None => false,
        }
    }

    /// Close `room`, ending every member's session
    pub fn close_room(&self, room: &str) -> usize {
        let members = self.lock().rooms.remove(room).unwrap_or_default();
        for member in &members {
            member.notify(SessionEvent::SessionEnded(EndReason::RoomClosed));
        }
        info!("Closed room {} ({} members)", room, members.len());
        members.len()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decode_token(token: &str) -> Result<TokenClaims, TransportError> {
        let bytes = general_purpose::URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| TransportError::MalformedToken(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::MalformedToken(e.to_string()))
    }
}

#[async_trait::async_trait]
impl SessionTransport for LoopbackHub {
    async fn establish(
        &self,
        endpoint: &str,
        token: &str,
        events: EventSink,
    ) -> Result<Arc<dyn SessionHandle>, TransportError> {
        let delay = {
            let mut state = self.lock();
            state.handshakes += 1;
            state.handshake_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if endpoint != self.endpoint {
            return Err(TransportError::Unreachable(format!(
                "no session server at {}",
                endpoint
            )));
        }

        let claims = Self::decode_token(token)?;

        let mut state = self.lock();
        if state.offline {
            return Err(TransportError::Unreachable(format!(
                "{} is not accepting connections",
                endpoint
            )));
        }
        if !state.issued.contains(token.trim()) {
            return Err(TransportError::AuthRejected(
                "token was not issued by this server".to_string(),
            ));
        }

        if let Some(members) = state.rooms.get(&claims.room) {
            if members.iter().any(|m| m.info.identity == claims.identity) {
                return Err(TransportError::AuthRejected(format!(
                    "identity {} is already connected",
                    claims.identity
                )));
            }
            if let Some(max) = state.capacity {
                if members.len() >= max {
                    return Err(TransportError::RoomFull(max));
                }
            }
        }

        let members = state.rooms.entry(claims.room.clone()).or_default();

        let info = ParticipantInfo {
            sid: format!("PA_{}", uuid::Uuid::new_v4().simple()),
            identity: claims.identity.clone(),
            joined_at: Utc::now(),
        };

        // Existing publications reach the newcomer through its own sink
        for existing in members.iter() {
            existing.notify(SessionEvent::ParticipantJoined(info.clone()));
            for publication in &existing.publications {
                let _ = events.send(SessionEvent::TrackAvailable(
                    existing.remote_track(&publication.info),
                ));
            }
        }

        members.push(Member {
            info: info.clone(),
            events,
            publications: Vec::new(),
        });

        info!(
            "{} joined room {} ({} members)",
            info.identity,
            claims.room,
            members.len()
        );

        Ok(Arc::new(LoopbackSession {
            hub: self.clone(),
            room: claims.room,
            local: info,
            closed: AtomicBool::new(false),
            next_track: AtomicUsize::new(0),
        }))
    }

    fn name(&self) -> &str {
        "loopback"
    }
}

/// One member's view of a loopback room
struct LoopbackSession {
    hub: LoopbackHub,
    room: String,
    local: ParticipantInfo,
    closed: AtomicBool,
    next_track: AtomicUsize,
}

impl LoopbackSession {
    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(TransportError::NotConnected)
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl SessionHandle for LoopbackSession {
    fn room_name(&self) -> String {
        self.room.clone()
    }

    fn local_participant(&self) -> ParticipantInfo {
        self.local.clone()
    }

    fn remote_participants(&self) -> Vec<ParticipantInfo> {
        self.hub
            .lock()
            .rooms
            .get(&self.room)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| m.info.sid != self.local.sid)
                    .map(|m| m.info.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn publish(
        &self,
        track: &MediaTrack,
        options: PublishOptions,
    ) -> Result<TrackPublication, TransportError> {
        self.ensure_open()?;
        if !track.is_live() {
            return Err(anyhow::anyhow!("cannot publish stopped track {}", track.id()).into());
        }

        let publication = TrackPublication {
            sid: format!(
                "TR_{}{}",
                self.next_track.fetch_add(1, Ordering::SeqCst),
                uuid::Uuid::new_v4().simple()
            ),
            name: options.name,
            kind: track.kind(),
            source: options.source,
        };

        let mut state = self.hub.lock();
        let members = state
            .rooms
            .get_mut(&self.room)
            .ok_or(TransportError::NotConnected)?;
        let index = members
            .iter()
            .position(|m| m.info.sid == self.local.sid)
            .ok_or(TransportError::NotConnected)?;

        members[index].publications.push(Publication {
            info: publication.clone(),
            sending: true,
        });

        let remote = members[index].remote_track(&publication);
        for (i, other) in members.iter().enumerate() {
            if i != index {
                other.notify(SessionEvent::TrackAvailable(remote.clone()));
            }
        }

        debug!(
            "{} published {} ({:?})",
            self.local.identity, publication.sid, publication.source
        );
        Ok(publication)
    }

    async fn unpublish(&self, track_sid: &str) -> Result<(), TransportError> {
        self.ensure_open()?;

        let mut state = self.hub.lock();
        let members = state
            .rooms
            .get_mut(&self.room)
            .ok_or(TransportError::NotConnected)?;
        let index = members
            .iter()
            .position(|m| m.info.sid == self.local.sid)
            .ok_or(TransportError::NotConnected)?;

        let position = members[index]
            .publications
            .iter()
            .position(|p| p.info.sid == track_sid)
            .ok_or_else(|| anyhow::anyhow!("unknown track {}", track_sid))?;
        let removed = members[index].publications.remove(position);

        let remote = members[index].remote_track(&removed.info);
        for (i, other) in members.iter().enumerate() {
            if i != index {
                other.notify(SessionEvent::TrackRemoved(remote.clone()));
            }
        }
        Ok(())
    }

    async fn set_publishing(&self, track_sid: &str, enabled: bool) -> Result<(), TransportError> {
        self.ensure_open()?;

        let mut state = self.hub.lock();
        let publication = state
            .rooms
            .get_mut(&self.room)
            .and_then(|members| members.iter_mut().find(|m| m.info.sid == self.local.sid))
            .and_then(|m| m.publications.iter_mut().find(|p| p.info.sid == track_sid))
            .ok_or_else(|| anyhow::anyhow!("unknown track {}", track_sid))?;

        publication.sending = enabled;
        debug!("Track {} sending={}", track_sid, enabled);
        Ok(())
    }

    fn teardown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let removed = self.hub.lock().remove_member(&self.room, &self.local.sid);
        match removed {
            Some(_) => info!("{} left room {}", self.local.identity, self.room),
            None => debug!(
                "{} was no longer a member of room {}",
                self.local.identity, self.room
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TrackKind;
    use crate::transport::TrackSource;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn rejects_tokens_it_did_not_issue() {
        let hub = LoopbackHub::default();
        let other = LoopbackHub::default();
        let foreign = other.issue_token("demo", "mallory");

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = hub
            .establish(LOOPBACK_ENDPOINT, &foreign, tx)
            .await
            .err()
            .expect("foreign token must be rejected");
        assert!(matches!(err, TransportError::AuthRejected(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let hub = LoopbackHub::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = hub
            .establish(LOOPBACK_ENDPOINT, "not a token!", tx)
            .await
            .err()
            .expect("garbage must not decode");
        assert!(matches!(err, TransportError::MalformedToken(_)));
    }

    #[tokio::test]
    async fn newcomer_receives_existing_publications() {
        let hub = LoopbackHub::default();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let alice = hub
            .establish(LOOPBACK_ENDPOINT, &hub.issue_token("demo", "alice"), tx_a)
            .await
            .unwrap();
        let track = MediaTrack::new(TrackKind::Audio, "mic");
        let publication = alice
            .publish(
                &track,
                PublishOptions {
                    name: "microphone".into(),
                    source: TrackSource::Microphone,
                },
            )
            .await
            .unwrap();

        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let _bob = hub
            .establish(LOOPBACK_ENDPOINT, &hub.issue_token("demo", "bob"), tx_b)
            .await
            .unwrap();

        match rx_b.try_recv().unwrap() {
            SessionEvent::TrackAvailable(remote) => {
                assert_eq!(remote.sid, publication.sid);
                assert_eq!(remote.participant_identity, "alice");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
