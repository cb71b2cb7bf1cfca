use tracing::{debug, info};

use super::capture::LocalCapture;
use super::join::CaptureSourceMode;
use crate::error::CaptureError;
use crate::transport::SessionHandle;

/// Flip the mute state of the local capture
///
/// - Microphone: the transport stops (or resumes) sending the track, so a
///   muted microphone uses no upstream bandwidth.
/// - SystemAudio: only the track's enabled flag changes; the share itself
///   stays in place so the user is not prompted again on unmute.
///
/// Without a capture this is a no-op returning `currently_muted`.
pub async fn toggle(
    capture: Option<&LocalCapture>,
    handle: &dyn SessionHandle,
    currently_muted: bool,
) -> Result<bool, CaptureError> {
    let Some(capture) = capture else {
        debug!("Mute toggle ignored: nothing is being captured");
        return Ok(currently_muted);
    };

    let muted = !currently_muted;

    match capture.mode() {
        CaptureSourceMode::Microphone => {
            handle
                .set_publishing(&capture.publication().sid, !muted)
                .await
                .map_err(CaptureError::Publish)?;
        }
        CaptureSourceMode::SystemAudio => {
            capture.audio_track().set_enabled(!muted);
        }
    }

    info!(
        "{} {}",
        capture.mode(),
        if muted { "muted" } else { "unmuted" }
    );
    Ok(muted)
}
