//! Analysis result model: changes, annotations, recommended actions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::FieldChange;
use crate::event::{Appointment, ParticipationStatus};

/// Terminal classification of one detected delta. Each change is a
/// finished verdict, not a state machine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
    /// Add a delete-exception marker to the master series, for cancelling
    /// an occurrence that was never materialized as a stored exception.
    CreateDeleteException,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
            ChangeKind::CreateDeleteException => "create-delete-exception",
        };
        write!(f, "{}", s)
    }
}

/// One detected delta to apply to the recipient's calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    /// True if this change concerns a single recurrence instance rather
    /// than a whole series.
    pub is_exception: bool,
    pub new_appointment: Option<Appointment>,
    /// The stored state being changed, if any.
    pub current_appointment: Option<Appointment>,
    pub deleted_appointment: Option<Appointment>,
    /// The series master; set iff `is_exception` is true.
    pub master_appointment: Option<Appointment>,
    /// Stored appointments overlapping `new_appointment` in time. Owned by
    /// this change; the purger replaces it with a filtered sequence.
    pub conflicts: Vec<Appointment>,
    /// Field diff between current and new. Always present for updates
    /// (possibly empty), optional otherwise.
    pub diff: Option<Vec<FieldChange>>,
    pub participant_change: Option<ParticipantChange>,
}

impl Change {
    pub fn new(kind: ChangeKind) -> Self {
        Change {
            kind,
            is_exception: false,
            new_appointment: None,
            current_appointment: None,
            deleted_appointment: None,
            master_appointment: None,
            conflicts: Vec::new(),
            diff: None,
            participant_change: None,
        }
    }
}

/// The participant-state part of a reply: the sender's comment and the
/// confirmation-status transitions being applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantChange {
    pub comment: Option<String>,
    pub transitions: Vec<StatusTransition>,
    /// True when the reply introduced a participant not previously known.
    pub party_crasher: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub email: String,
    pub from: Option<ParticipationStatus>,
    pub to: Option<ParticipationStatus>,
}

/// A human-facing explanation, used when no structural change applies
/// (unknown UID, stale sequence, irrelevant counter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub message: String,
    pub appointment: Option<Appointment>,
}

impl Annotation {
    pub fn new(message: impl Into<String>) -> Self {
        Annotation {
            message: message.into(),
            appointment: None,
        }
    }

    pub fn with_appointment(message: impl Into<String>, appointment: Appointment) -> Self {
        Annotation {
            message: message.into(),
            appointment: Some(appointment),
        }
    }
}

/// An action the user can be offered in response to the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Accept,
    AcceptAndIgnoreConflicts,
    AcceptAndReplace,
    AcceptPartyCrasher,
    Decline,
    Tentative,
    Delegate,
    Counter,
    DeclineCounter,
    Update,
    Delete,
    Ignore,
    Refresh,
    SendAppointment,
}

/// The result of analyzing one scheduling message: ordered changes,
/// ordered annotations, and the derived set of recommended actions.
/// Private to the call that created it.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Analysis {
    pub changes: Vec<Change>,
    pub annotations: Vec<Annotation>,
    pub actions: BTreeSet<Action>,
    /// Set when a sequence-staleness check fired; the recommender then
    /// offers {Ignore} regardless of the changes.
    pub stale: bool,
}

impl Analysis {
    pub fn new() -> Self {
        Analysis::default()
    }

    pub fn push_change(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn annotate(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn recommend(&mut self, action: Action) {
        self.actions.insert(action);
    }
}
