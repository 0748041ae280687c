//! Field-level diff between two appointments.
//!
//! Computes the set of semantically differing fields, used for
//! user-facing change summaries and for deciding whether an update
//! reschedules anything. Bookkeeping fields (object id, sequence) are
//! never part of a diff.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{Appointment, Attendee};

/// A semantic appointment field that can appear in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentField {
    Summary,
    Description,
    Location,
    Start,
    End,
    Recurrence,
    Organizer,
    Attendees,
}

impl AppointmentField {
    /// True for fields whose change moves the appointment in time.
    pub fn is_scheduling(&self) -> bool {
        matches!(
            self,
            AppointmentField::Start | AppointmentField::End | AppointmentField::Recurrence
        )
    }
}

impl fmt::Display for AppointmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentField::Summary => "summary",
            AppointmentField::Description => "description",
            AppointmentField::Location => "location",
            AppointmentField::Start => "start",
            AppointmentField::End => "end",
            AppointmentField::Recurrence => "recurrence",
            AppointmentField::Organizer => "organizer",
            AppointmentField::Attendees => "attendees",
        };
        write!(f, "{}", s)
    }
}

/// A single field change (for user-facing summaries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: AppointmentField,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Compute the fields whose values differ between `current` and `new`,
/// in declaration order.
pub fn diff_appointments(current: &Appointment, new: &Appointment) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    push_if_differs(
        &mut changes,
        AppointmentField::Summary,
        Some(&current.summary),
        Some(&new.summary),
    );
    push_if_differs(
        &mut changes,
        AppointmentField::Description,
        current.description.as_ref(),
        new.description.as_ref(),
    );
    push_if_differs(
        &mut changes,
        AppointmentField::Location,
        current.location.as_ref(),
        new.location.as_ref(),
    );
    push_if_differs(
        &mut changes,
        AppointmentField::Start,
        current.start.as_ref(),
        new.start.as_ref(),
    );
    push_if_differs(
        &mut changes,
        AppointmentField::End,
        current.end.as_ref(),
        new.end.as_ref(),
    );
    push_if_differs(
        &mut changes,
        AppointmentField::Recurrence,
        current.recurrence.as_ref(),
        new.recurrence.as_ref(),
    );

    if current.organizer != new.organizer {
        changes.push(FieldChange {
            field: AppointmentField::Organizer,
            old: current.organizer.as_ref().map(attendee_display),
            new: new.organizer.as_ref().map(attendee_display),
        });
    }

    if current.attendees != new.attendees {
        changes.push(FieldChange {
            field: AppointmentField::Attendees,
            old: Some(attendee_list_display(&current.attendees)),
            new: Some(attendee_list_display(&new.attendees)),
        });
    }

    changes
}

/// Whether a diff touches any scheduling field (start, end, recurrence).
pub fn reschedules(diff: &[FieldChange]) -> bool {
    diff.iter().any(|c| c.field.is_scheduling())
}

fn push_if_differs<T: PartialEq + ToString>(
    changes: &mut Vec<FieldChange>,
    field: AppointmentField,
    old: Option<&T>,
    new: Option<&T>,
) {
    if old != new {
        changes.push(FieldChange {
            field,
            old: old.map(|v| v.to_string()),
            new: new.map(|v| v.to_string()),
        });
    }
}

fn attendee_display(a: &Attendee) -> String {
    match &a.name {
        Some(name) => format!("{} <{}>", name, a.email),
        None => a.email.clone(),
    }
}

fn attendee_list_display(attendees: &[Attendee]) -> String {
    attendees
        .iter()
        .map(attendee_display)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_diff_contains_exactly_the_differing_fields() {
        let mut current = Appointment::new("uid-1", "Standup");
        current.location = Some("Room 1".to_string());
        current.start = Some(Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap());
        current.end = Some(Utc.with_ymd_and_hms(2025, 3, 20, 9, 30, 0).unwrap());

        let mut new = current.clone();
        new.summary = "Daily standup".to_string();
        new.start = Some(Utc.with_ymd_and_hms(2025, 3, 20, 10, 0, 0).unwrap());

        let diff = diff_appointments(&current, &new);
        let fields: Vec<_> = diff.iter().map(|c| c.field).collect();
        assert_eq!(
            fields,
            vec![AppointmentField::Summary, AppointmentField::Start]
        );
    }

    #[test]
    fn test_equal_appointments_produce_empty_diff() {
        let a = Appointment::new("uid-1", "Standup");
        assert!(diff_appointments(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_bookkeeping_fields_are_ignored() {
        let current = Appointment::new("uid-1", "Standup");
        let mut new = current.clone();
        new.object_id = Some("99".to_string());
        new.sequence = 5;
        assert!(diff_appointments(&current, &new).is_empty());
    }

    #[test]
    fn test_reschedules_only_for_scheduling_fields() {
        let current = Appointment::new("uid-1", "Standup");
        let mut new = current.clone();
        new.description = Some("agenda attached".to_string());
        let diff = diff_appointments(&current, &new);
        assert!(!reschedules(&diff));

        new.end = Some(Utc.with_ymd_and_hms(2025, 3, 20, 11, 0, 0).unwrap());
        let diff = diff_appointments(&current, &new);
        assert!(reschedules(&diff));
    }

    #[test]
    fn test_attendee_change_is_one_entry() {
        let mut current = Appointment::new("uid-1", "Standup");
        current.attendees = vec![Attendee::external("alice@example.com")];
        let mut new = current.clone();
        new.attendees.push(Attendee::external("bob@example.com"));

        let diff = diff_appointments(&current, &new);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].field, AppointmentField::Attendees);
        assert_eq!(
            diff[0].new.as_deref(),
            Some("alice@example.com, bob@example.com")
        );
    }
}
