// Room service: one task owning one controller
//
// Commands from any number of callers and events from the transport are
// funnelled into a single select loop, so the controller sees them one at
// a time in arrival order.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::controller::{LeaveSignal, RoomController};
use super::join::{JoinOutcome, JoinRequest};
use super::status::{RoomStatus, RoomUpdate};
use crate::error::RoomError;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("the room service is not running")]
    Stopped,
}

enum Command {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<Result<JoinOutcome, RoomError>>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
    ToggleMute {
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<RoomStatus>,
    },
}

pub struct RoomService;

impl RoomService {
    /// Move `controller` into a background task and return a handle to it
    pub fn spawn(controller: RoomController) -> (RoomServiceHandle, JoinHandle<()>) {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = RoomServiceHandle {
            commands,
            leave: controller.leave_signal(),
            updates: controller.update_sender(),
        };

        let task = tokio::spawn(Self::run(controller, rx));
        (handle, task)
    }

    async fn run(mut controller: RoomController, mut commands: mpsc::Receiver<Command>) {
        info!("Room service started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => Self::dispatch(&mut controller, command).await,
                    None => break,
                },
                event = controller.next_event() => controller.handle_event(event),
            }
        }

        controller.disconnect();
        info!("Room service stopped");
    }

    async fn dispatch(controller: &mut RoomController, command: Command) {
        match command {
            Command::Join { request, reply } => {
                let result = controller.join(&request).await;
                let _ = reply.send(result);
            }
            Command::Leave { reply } => {
                controller.disconnect();
                let _ = reply.send(());
            }
            Command::ToggleMute { reply } => {
                let muted = controller.toggle_mute().await;
                let _ = reply.send(muted);
            }
            Command::Status { reply } => {
                let _ = reply.send(controller.status());
            }
        }
        debug!("Room service command handled");
    }
}

/// Cloneable front end to a [`RoomService`]
#[derive(Clone)]
pub struct RoomServiceHandle {
    commands: mpsc::Sender<Command>,
    leave: LeaveSignal,
    updates: broadcast::Sender<RoomUpdate>,
}

impl RoomServiceHandle {
    pub async fn join(&self, request: JoinRequest) -> Result<JoinOutcome, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Join { request, reply }).await?;
        Ok(rx.await.map_err(|_| ServiceError::Stopped)??)
    }

    /// Leave the room, abandoning a join that is still handshaking
    pub async fn leave(&self) -> Result<(), ServiceError> {
        self.leave.request();
        let (reply, rx) = oneshot::channel();
        self.send(Command::Leave { reply }).await?;
        rx.await.map_err(|_| ServiceError::Stopped)
    }

    pub async fn toggle_mute(&self) -> Result<bool, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ToggleMute { reply }).await?;
        rx.await.map_err(|_| ServiceError::Stopped)
    }

    pub async fn status(&self) -> Result<RoomStatus, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        rx.await.map_err(|_| ServiceError::Stopped)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomUpdate> {
        self.updates.subscribe()
    }

    async fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServiceError::Stopped)
    }
}
