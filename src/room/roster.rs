use serde::{Deserialize, Serialize};

use crate::transport::{ParticipantInfo, SessionHandle};

/// One row of the participant list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub display_name: String,
    pub session_participant_id: String,
}

impl From<ParticipantInfo> for ParticipantRecord {
    fn from(info: ParticipantInfo) -> Self {
        Self {
            display_name: info.identity,
            session_participant_id: info.sid,
        }
    }
}

/// Derive the participant list from the session's membership view
///
/// Always a full recompute: the local participant first, then remote
/// participants in the order the transport reports them.
pub fn refresh(handle: &dyn SessionHandle) -> Vec<ParticipantRecord> {
    std::iter::once(handle.local_participant())
        .chain(handle.remote_participants())
        .map(ParticipantRecord::from)
        .collect()
}

/// Participant list plus the room-size policy used to render it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    participants: Vec<ParticipantRecord>,
    capacity: Option<usize>,
}

impl Roster {
    pub fn derive(handle: &dyn SessionHandle, capacity: Option<usize>) -> Self {
        Self {
            participants: refresh(handle),
            capacity,
        }
    }

    pub fn empty(capacity: Option<usize>) -> Self {
        Self {
            participants: Vec::new(),
            capacity,
        }
    }

    pub fn participants(&self) -> &[ParticipantRecord] {
        &self.participants
    }

    pub fn local(&self) -> Option<&ParticipantRecord> {
        self.participants.first()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity.map_or(false, |max| self.len() >= max)
    }

    /// Display names, with the local participant marked
    pub fn labels(&self) -> Vec<String> {
        self.participants
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if i == 0 {
                    format!("{} (You)", p.display_name)
                } else {
                    p.display_name.clone()
                }
            })
            .collect()
    }

    /// Heading such as "Participants (3)" or "Participants (2/2)"
    pub fn summary(&self) -> String {
        match self.capacity {
            Some(max) => format!("Participants ({}/{})", self.len(), max),
            None => format!("Participants ({})", self.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> ParticipantRecord {
        ParticipantRecord {
            display_name: name.to_string(),
            session_participant_id: format!("PA_{}", name),
        }
    }

    #[test]
    fn only_first_entry_is_marked_local() {
        let roster = Roster {
            participants: vec![record("alice"), record("bob")],
            capacity: None,
        };
        assert_eq!(roster.labels(), vec!["alice (You)", "bob"]);
        assert_eq!(roster.summary(), "Participants (2)");
        assert!(!roster.is_full());
    }

    #[test]
    fn summary_shows_capacity_when_configured() {
        let roster = Roster {
            participants: vec![record("alice"), record("bob")],
            capacity: Some(2),
        };
        assert_eq!(roster.summary(), "Participants (2/2)");
        assert!(roster.is_full());
    }
}
