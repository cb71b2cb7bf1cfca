use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use super::capture::{CaptureManager, CaptureSettings, LocalCapture};
use super::join::{CaptureSourceMode, JoinOutcome, JoinRequest};
use super::mute;
use super::roster::{ParticipantRecord, Roster};
use super::status::{ConnectionState, RoomStatus, RoomUpdate};
use crate::error::{CaptureError, ErrorKind, ErrorReport, RoomError, TransportError};
use crate::media::{MediaDevices, TrackKind};
use crate::transport::{
    EndReason, EventStream, RemoteTrack, SessionEvent, SessionHandle, SessionTransport,
    TrackPublication,
};

/// Buffered room updates per listener before the oldest are dropped
const UPDATE_CAPACITY: usize = 64;

/// Room-level policy for a controller
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// Maximum room size, used when rendering the roster
    pub max_participants: Option<usize>,

    /// Upper bound on the transport handshake
    pub connect_timeout: Duration,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            max_participants: None,
            connect_timeout: Duration::from_secs(15),
        }
    }
}

/// Asks an in-flight `connect` to give up once its handshake completes
#[derive(Debug, Clone, Default)]
pub struct LeaveSignal(Arc<AtomicBool>);

impl LeaveSignal {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Everything that exists only while connected
struct ActiveSession {
    handle: Arc<dyn SessionHandle>,
    events: EventStream,
    room_name: String,
    display_name: String,
    mode: CaptureSourceMode,
    capture: Option<LocalCapture>,
    muted: bool,
    remote_audio: Vec<RemoteTrack>,
    connected_at: DateTime<Utc>,
}

/// Session lifecycle controller
///
/// Owns the session handle and the local capture. Every transition goes
/// through `&mut self`, so callers serialize operations and transport
/// events simply by owning the controller.
pub struct RoomController {
    transport: Arc<dyn SessionTransport>,
    capture: CaptureManager,
    options: RoomOptions,
    state: ConnectionState,
    session: Option<ActiveSession>,
    roster: Roster,
    leave: LeaveSignal,
    updates: broadcast::Sender<RoomUpdate>,
    last_error: Option<ErrorReport>,
}

impl RoomController {
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        devices: Arc<dyn MediaDevices>,
        settings: CaptureSettings,
        options: RoomOptions,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        let roster = Roster::empty(options.max_participants);

        Self {
            transport,
            capture: CaptureManager::new(devices, settings),
            options,
            state: ConnectionState::Disconnected,
            session: None,
            roster,
            leave: LeaveSignal::default(),
            updates,
            last_error: None,
        }
    }

    /// Listen for state, roster, mute and failure notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RoomUpdate> {
        self.updates.subscribe()
    }

    pub(crate) fn update_sender(&self) -> broadcast::Sender<RoomUpdate> {
        self.updates.clone()
    }

    /// Handle for cancelling a join from outside the owning task
    pub fn leave_signal(&self) -> LeaveSignal {
        self.leave.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_muted(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.muted)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn participants(&self) -> &[ParticipantRecord] {
        self.roster.participants()
    }

    pub fn local_capture(&self) -> Option<&LocalCapture> {
        self.session.as_ref().and_then(|s| s.capture.as_ref())
    }

    pub fn remote_audio_tracks(&self) -> &[RemoteTrack] {
        self.session
            .as_ref()
            .map(|s| s.remote_audio.as_slice())
            .unwrap_or_default()
    }

    pub fn last_error(&self) -> Option<&ErrorReport> {
        self.last_error.as_ref()
    }

    pub fn status(&self) -> RoomStatus {
        let session = self.session.as_ref();
        let connected_at = session.map(|s| s.connected_at);
        let duration_secs = connected_at
            .map(|at| Utc::now().signed_duration_since(at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        RoomStatus {
            state: self.state,
            room_name: session.map(|s| s.room_name.clone()),
            display_name: session.map(|s| s.display_name.clone()),
            source: session.map(|s| s.mode),
            publishing: session.map_or(false, |s| s.capture.is_some()),
            muted: self.is_muted(),
            participants: self.roster.participants().to_vec(),
            labels: self.roster.labels(),
            summary: self.roster.summary(),
            remote_audio_tracks: self.remote_audio_tracks().len(),
            connected_at,
            duration_secs,
            last_error: self.last_error.clone(),
        }
    }

    /// Connect, then capture and publish local audio
    ///
    /// A capture failure leaves the session connected with nothing
    /// published; the caller may retry [`acquire`](Self::acquire) or leave.
    pub async fn join(&mut self, request: &JoinRequest) -> Result<JoinOutcome, RoomError> {
        let outcome = self.connect(request).await?;
        if outcome == JoinOutcome::Joined {
            self.acquire().await?;
        }
        Ok(outcome)
    }

    /// Establish the session described by `request`
    pub async fn connect(&mut self, request: &JoinRequest) -> Result<JoinOutcome, RoomError> {
        if let Err(e) = request.validate() {
            return Err(self.fail(e));
        }
        if self.session.is_some() {
            return Err(self.fail(RoomError::Validation(
                "Already in a room. Leave it before joining another.".to_string(),
            )));
        }

        self.leave.reset();
        self.last_error = None;
        self.set_state(ConnectionState::Connecting);

        info!(
            "Joining room {} as {} via {} ({})",
            request.room_name,
            request.display_name,
            self.transport.name(),
            request.server_url
        );

        // The sink goes to the transport with the handshake itself, so the
        // receiving end is in place before any membership event exists
        let (sink, events) = mpsc::unbounded_channel();
        let handshake = tokio::time::timeout(
            self.options.connect_timeout,
            self.transport
                .establish(request.server_url.trim(), request.token.trim(), sink),
        )
        .await;

        let handle = match handshake {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(self.fail(RoomError::Connection(e)));
            }
            Err(_) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(self.fail(RoomError::Connection(TransportError::Unreachable(
                    format!(
                        "handshake timed out after {}s",
                        self.options.connect_timeout.as_secs_f64()
                    ),
                ))));
            }
        };

        if self.leave.take() {
            info!("Leave requested during handshake; closing the new session");
            handle.teardown();
            self.set_state(ConnectionState::Disconnected);
            return Ok(JoinOutcome::Abandoned);
        }

        let room_name = handle.room_name();
        if room_name != request.room_name.trim() {
            warn!(
                "Token admitted us to room {} but {} was requested",
                room_name, request.room_name
            );
        }

        self.session = Some(ActiveSession {
            handle,
            events,
            room_name,
            display_name: request.display_name.trim().to_string(),
            mode: request.source,
            capture: None,
            muted: false,
            remote_audio: Vec::new(),
            connected_at: Utc::now(),
        });

        self.set_state(ConnectionState::Connected);
        self.refresh_roster();
        Ok(JoinOutcome::Joined)
    }

    /// Capture local audio for the session's mode and publish it
    ///
    /// Replaces any capture already in place.
    pub async fn acquire(&mut self) -> Result<TrackPublication, RoomError> {
        let (handle, mode, previous, was_muted) = match self.session.as_mut() {
            Some(session) => (
                session.handle.clone(),
                session.mode,
                session.capture.take(),
                std::mem::replace(&mut session.muted, false),
            ),
            None => return Err(self.fail(CaptureError::NotConnected.into())),
        };

        // Mute belongs to the capture being replaced
        if was_muted {
            self.emit(RoomUpdate::MuteChanged { muted: false });
        }

        if let Some(previous) = previous {
            info!("Replacing existing {} capture", previous.mode());
            self.capture.release(previous, Some(handle.as_ref())).await;
        }

        match self.capture.acquire(mode, handle.as_ref()).await {
            Ok(capture) => {
                let publication = capture.publication().clone();
                match self.session.as_mut() {
                    Some(session) => session.capture = Some(capture),
                    None => CaptureManager::stop(capture),
                }
                Ok(publication)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Toggle mute, returning the resulting state
    ///
    /// Returns the current state unchanged when nothing is captured or the
    /// transport refuses the change.
    pub async fn toggle_mute(&mut self) -> bool {
        let (handle, current) = match self.session.as_ref() {
            Some(session) => (session.handle.clone(), session.muted),
            None => {
                debug!("Mute toggle ignored: not connected");
                return false;
            }
        };

        let result = mute::toggle(
            self.session.as_ref().and_then(|s| s.capture.as_ref()),
            handle.as_ref(),
            current,
        )
        .await;

        match result {
            Ok(muted) => {
                if let Some(session) = self.session.as_mut() {
                    session.muted = muted;
                }
                if muted != current {
                    self.emit(RoomUpdate::MuteChanged { muted });
                }
                muted
            }
            Err(e) => {
                self.fail(e.into());
                current
            }
        }
    }

    /// Leave the room; a no-op when not connected
    pub fn disconnect(&mut self) {
        self.shutdown(None);
    }

    /// Wait for the next transport event
    ///
    /// Pending forever while disconnected, which makes it safe to poll in a
    /// `select!` loop. A closed event stream is reported as a lost connection.
    pub async fn next_event(&mut self) -> SessionEvent {
        match self.session.as_mut() {
            Some(session) => session
                .events
                .recv()
                .await
                .unwrap_or(SessionEvent::SessionEnded(EndReason::ConnectionLost)),
            None => std::future::pending().await,
        }
    }

    /// Handle every event already queued, returning how many were handled
    pub fn process_pending_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let event = match self.session.as_mut() {
                Some(session) => match session.events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        SessionEvent::SessionEnded(EndReason::ConnectionLost)
                    }
                },
                None => break,
            };
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Apply one transport event
    pub fn handle_event(&mut self, event: SessionEvent) {
        if self.session.is_none() {
            debug!("Ignoring {:?}: no active session", event);
            return;
        }

        match event {
            SessionEvent::ParticipantJoined(participant) => {
                info!("{} joined", participant.identity);
                self.refresh_roster();
            }
            SessionEvent::ParticipantLeft(participant) => {
                info!("{} left", participant.identity);
                self.refresh_roster();
            }
            SessionEvent::TrackAvailable(track) => self.attach_remote(track),
            SessionEvent::TrackRemoved(track) => self.detach_remote(&track.sid),
            SessionEvent::SessionEnded(reason) => {
                warn!("Session ended by transport: {}", reason);
                self.shutdown(Some(reason));
            }
        }
    }

    fn attach_remote(&mut self, track: RemoteTrack) {
        if track.kind != TrackKind::Audio {
            debug!("Ignoring {:?} track {}", track.kind, track.sid);
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.remote_audio.iter().any(|t| t.sid == track.sid) {
            return;
        }

        info!(
            "Attached audio {} from {}",
            track.sid, track.participant_identity
        );
        session.remote_audio.push(track.clone());
        self.emit(RoomUpdate::AudioAttached { track });
    }

    fn detach_remote(&mut self, track_sid: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let before = session.remote_audio.len();
        session.remote_audio.retain(|t| t.sid != track_sid);

        if session.remote_audio.len() != before {
            info!("Detached audio {}", track_sid);
            self.emit(RoomUpdate::AudioDetached {
                track_sid: track_sid.to_string(),
            });
        }
    }

    fn refresh_roster(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        self.roster = Roster::derive(session.handle.as_ref(), self.options.max_participants);

        debug!("{}: {:?}", self.roster.summary(), self.roster.labels());
        self.emit(RoomUpdate::RosterChanged {
            participants: self.roster.participants().to_vec(),
        });
    }

    /// Single teardown path for user- and transport-initiated disconnects
    fn shutdown(&mut self, reason: Option<EndReason>) {
        let Some(session) = self.session.take() else {
            debug!("Disconnect ignored: no active session");
            return;
        };

        // Capture goes first so it never outlives the handle
        if let Some(capture) = session.capture {
            CaptureManager::stop(capture);
        }
        session.handle.teardown();

        self.roster = Roster::empty(self.options.max_participants);
        self.set_state(ConnectionState::Disconnected);
        self.emit(RoomUpdate::RosterChanged {
            participants: Vec::new(),
        });

        match reason {
            None => info!("Left room {}", session.room_name),
            Some(reason) => {
                self.fail(RoomError::TransportFault(reason.to_string()));
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!("Connection state: {} -> {}", self.state, state);
        self.state = state;
        self.emit(RoomUpdate::StateChanged { state });
    }

    fn fail(&mut self, err: RoomError) -> RoomError {
        let report = err.report();
        match report.kind {
            ErrorKind::Validation => warn!("{}", report.message),
            _ => error!("{}", report.message),
        }
        debug!("{}", report.detail);

        self.last_error = Some(report.clone());
        self.emit(RoomUpdate::Failed { report });
        err
    }

    fn emit(&self, update: RoomUpdate) {
        // No listeners is fine
        let _ = self.updates.send(update);
    }
}

impl Drop for RoomController {
    fn drop(&mut self) {
        if self.session.is_some() {
            info!("Controller dropped while connected; releasing session");
            self.shutdown(None);
        }
    }
}
