pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod room;
pub mod transport;

pub use config::Config;
pub use error::{CaptureError, DeviceError, ErrorKind, ErrorReport, RoomError, TransportError};
pub use http::{create_router, AppState};
pub use media::{MediaDevices, MediaStream, MediaTrack, SimulatedDevices, TrackKind};
pub use room::{
    CaptureSourceMode, ConnectionState, JoinOutcome, JoinRequest, LeaveSignal, LocalCapture,
    ParticipantRecord, RoomController, RoomOptions, RoomService, RoomServiceHandle, RoomStatus,
    RoomUpdate, Roster,
};
pub use transport::{LoopbackHub, SessionEvent, SessionHandle, SessionTransport};
