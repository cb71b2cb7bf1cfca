use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RoomError;

/// Where the local audio comes from
///
/// Chosen before joining and fixed for the life of the session; switching
/// means leaving and joining again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaptureSourceMode {
    /// Audio of a shared tab or the whole system
    #[default]
    #[serde(rename = "system")]
    SystemAudio,
    #[serde(rename = "microphone")]
    Microphone,
}

impl fmt::Display for CaptureSourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSourceMode::SystemAudio => write!(f, "System Audio"),
            CaptureSourceMode::Microphone => write!(f, "Microphone"),
        }
    }
}

impl FromStr for CaptureSourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" | "system-audio" | "tab" => Ok(CaptureSourceMode::SystemAudio),
            "microphone" | "mic" => Ok(CaptureSourceMode::Microphone),
            other => Err(format!(
                "unknown audio source '{}' (expected 'system' or 'microphone')",
                other
            )),
        }
    }
}

/// Everything needed to join a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Session server address (e.g. "wss://example.livekit.cloud")
    pub server_url: String,

    pub room_name: String,

    pub display_name: String,

    /// Pre-issued access token, opaque to this crate
    pub token: String,

    #[serde(default)]
    pub source: CaptureSourceMode,
}

impl JoinRequest {
    /// Check that every required field is filled in
    ///
    /// Whitespace-only values count as empty.
    pub fn validate(&self) -> Result<(), RoomError> {
        let missing: Vec<&str> = [
            ("server URL", &self.server_url),
            ("room name", &self.room_name),
            ("display name", &self.display_name),
            ("access token", &self.token),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RoomError::Validation(format!(
                "Please fill in all fields (missing: {})",
                missing.join(", ")
            )))
        }
    }
}

/// Result of a join attempt that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined,
    /// A leave was requested while the handshake was in flight; the
    /// session was torn down as soon as it came up
    Abandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> JoinRequest {
        JoinRequest {
            server_url: "wss://rooms.example.com".into(),
            room_name: "demo".into(),
            display_name: "alice".into(),
            token: "t0k3n".into(),
            source: CaptureSourceMode::Microphone,
        }
    }

    #[test]
    fn complete_request_is_valid() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn lists_every_missing_field() {
        let mut req = request();
        req.room_name = "   ".into();
        req.token.clear();

        let err = req.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please fill in all fields (missing: room name, access token)"
        );
    }

    #[test]
    fn parses_source_names() {
        assert_eq!(
            "system".parse::<CaptureSourceMode>(),
            Ok(CaptureSourceMode::SystemAudio)
        );
        assert_eq!(
            "Mic".parse::<CaptureSourceMode>(),
            Ok(CaptureSourceMode::Microphone)
        );
        assert!("camera".parse::<CaptureSourceMode>().is_err());
    }

    #[test]
    fn source_uses_short_wire_names() {
        let json = serde_json::to_string(&CaptureSourceMode::SystemAudio).unwrap();
        assert_eq!(json, "\"system\"");
    }
}
