pub mod devices;
pub mod simulated;
pub mod track;

pub use devices::{AudioConstraints, DisplayMediaConstraints, MediaDevices, VideoConstraints};
pub use simulated::{MicrophoneResponse, ShareResponse, SimulatedDevices};
pub use track::{MediaStream, MediaTrack, TrackKind};
