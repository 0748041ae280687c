//! Appointment value model.
//!
//! These types represent one calendar object (a series master, a single
//! occurrence, or a recurrence exception) in a storage-neutral way. The
//! analyzers never mutate stored appointments; they build new values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A calendar appointment (master series, single occurrence, or exception).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Storage identity. `None` for incoming payloads that have not been
    /// stored yet. "Is this the same appointment" is decided by this id,
    /// never by deep equality.
    pub object_id: Option<String>,
    /// Scheduling UID, shared by all representations of the same event.
    pub uid: String,
    /// Revision counter (iTip SEQUENCE); stale updates carry a lower one.
    pub sequence: i64,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub organizer: Option<Attendee>,
    pub attendees: Vec<Attendee>,
    /// Recurrence rule text for masters. Opaque to this engine; expansion
    /// lives in the storage layer.
    pub recurrence: Option<String>,
    /// Which occurrence of a series this object refers to. Set on
    /// recurrence exceptions and occurrence-level message payloads.
    pub recurrence_date_position: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn new(uid: impl Into<String>, summary: impl Into<String>) -> Self {
        Appointment {
            object_id: None,
            uid: uid.into(),
            sequence: 0,
            summary: summary.into(),
            description: None,
            location: None,
            start: None,
            end: None,
            organizer: None,
            attendees: Vec::new(),
            recurrence: None,
            recurrence_date_position: None,
        }
    }

    /// Identity comparison by object id. Two structurally equal but
    /// differently-identified appointments are NOT the same object.
    pub fn same_object(&self, other: &Appointment) -> bool {
        match (&self.object_id, &other.object_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Whether the time ranges of two appointments overlap. Unknown
    /// boundaries count as overlapping (we cannot prove otherwise).
    pub fn overlaps(&self, other: &Appointment) -> bool {
        match (self.start, self.end, other.start, other.end) {
            (Some(s1), Some(e1), Some(s2), Some(e2)) => s1 < e2 && s2 < e1,
            _ => true,
        }
    }

    /// Find the attendee matching `other` by participant identity.
    pub fn find_attendee(&self, other: &Attendee) -> Option<&Attendee> {
        self.attendees.iter().find(|a| a.same_participant(other))
    }
}

/// An appointment participant (also used for the organizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    /// Display name
    pub name: Option<String>,
    /// Email address
    pub email: String,
    /// Internal entity id, when the participant is a known user
    pub entity_id: Option<i64>,
    /// Participation status (iTip PARTSTAT)
    pub participation: Option<ParticipationStatus>,
    /// Free-text comment attached to the participant's response
    pub comment: Option<String>,
}

impl Attendee {
    pub fn external(email: impl Into<String>) -> Self {
        Attendee {
            name: None,
            email: email.into(),
            entity_id: None,
            participation: None,
            comment: None,
        }
    }

    /// Participant identity: matching internal entity ids, or (when either
    /// side has none) case-insensitively matching email addresses.
    pub fn same_participant(&self, other: &Attendee) -> bool {
        match (self.entity_id, other.entity_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.email.eq_ignore_ascii_case(&other.email),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipationStatus {
    NeedsAction,
    Accepted,
    Declined,
    Tentative,
}
