//! Analyzer for ADD: attach a new recurrence exception to a known series.

use chrono::{DateTime, Utc};

use crate::analysis::{Action, Analysis, Annotation, Change, ChangeKind};
use crate::analyzer::{find_by_position, MethodAnalyzer};
use crate::diff::diff_appointments;
use crate::error::{ItipError, ItipResult};
use crate::event::Appointment;
use crate::message::{ItipMessage, ItipMethod};
use crate::storage::{CalendarLookup, Session};

const UNKNOWN_MASTER_MESSAGE: &str =
    "Got an occurrence for an appointment that could not be found. \
     Refreshing the appointment from the organizer may help.";

pub struct AddAnalyzer;

impl MethodAnalyzer for AddAnalyzer {
    fn methods(&self) -> &'static [ItipMethod] {
        &[ItipMethod::Add]
    }

    fn analyze(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
    ) -> ItipResult<Analysis> {
        if message.exceptions.is_empty() {
            return Err(ItipError::MalformedMessage(
                "ADD message carries no occurrence".to_string(),
            ));
        }

        let mut analysis = Analysis::new();
        let uid = message.uid().unwrap_or_default();

        let Some(master) = storage.resolve_uid(uid, session)? else {
            analysis.annotate(Annotation::new(UNKNOWN_MASTER_MESSAGE));
            analysis.recommend(Action::Refresh);
            return Ok(analysis);
        };

        let stored_exceptions = storage.exceptions(&master, session)?;

        for exception in &message.exceptions {
            let Some(position) = exception.recurrence_date_position else {
                continue;
            };
            match find_by_position(&stored_exceptions, position) {
                None => {
                    let mut change = Change::new(ChangeKind::Create);
                    change.is_exception = true;
                    change.master_appointment = Some(master.clone());
                    change.conflicts = storage.conflicts(exception, session)?;
                    change.new_appointment = Some(exception.clone());

                    // Summarize how the added occurrence diverges from
                    // what the series rule would have produced for it.
                    let baseline = series_occurrence(&master, position);
                    let diff = diff_appointments(&baseline, exception);
                    if !diff.is_empty() {
                        change.diff = Some(diff);
                    }

                    analysis.push_change(change);
                }
                Some(existing) => {
                    // This occurrence is already overridden; adding it
                    // again is a conflict of intent, offered as replace.
                    let mut change = Change::new(ChangeKind::Update);
                    change.is_exception = true;
                    change.master_appointment = Some(master.clone());
                    change.current_appointment = Some(existing.clone());
                    change.diff = Some(diff_appointments(existing, exception));
                    change.new_appointment = Some(exception.clone());
                    analysis.push_change(change);
                }
            }
        }

        Ok(analysis)
    }
}

/// The occurrence the series rule would produce at `position`: the master
/// re-timed to the position with its duration kept. Rule expansion itself
/// lives in the storage layer, so this is deliberately plain interval math.
fn series_occurrence(master: &Appointment, position: DateTime<Utc>) -> Appointment {
    let mut occurrence = master.clone();
    occurrence.object_id = None;
    occurrence.recurrence = None;
    occurrence.recurrence_date_position = Some(position);
    if let (Some(start), Some(end)) = (master.start, master.end) {
        occurrence.start = Some(position);
        occurrence.end = Some(position + (end - start));
    }
    occurrence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::storage::InMemoryCalendar;
    use chrono::TimeZone;

    fn session() -> Session {
        Session::new(1, 1)
    }

    fn master() -> Appointment {
        let mut a = Appointment::new("uid-1", "Series");
        a.start = Some(Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap());
        a.end = Some(Utc.with_ymd_and_hms(2025, 3, 20, 10, 0, 0).unwrap());
        a.recurrence = Some("FREQ=DAILY".to_string());
        a
    }

    fn add_message(exception: Appointment) -> ItipMessage {
        let mut m = ItipMessage::new(ItipMethod::Add);
        m.exceptions.push(exception);
        m
    }

    #[test]
    fn test_add_to_unknown_appointment_suggests_refresh() {
        let storage = InMemoryCalendar::new();
        let mut exception = Appointment::new("uid-unknown", "Extra session");
        exception.recurrence_date_position =
            Some(Utc.with_ymd_and_hms(2025, 3, 21, 9, 0, 0).unwrap());

        let analysis = analyze(&add_message(exception), &storage, &session()).unwrap();
        assert!(analysis.changes.is_empty());
        assert_eq!(analysis.annotations.len(), 1);
        assert_eq!(
            analysis.actions.iter().copied().collect::<Vec<_>>(),
            vec![Action::Refresh]
        );
    }

    #[test]
    fn test_add_new_occurrence_creates_exception_with_diff() {
        let mut storage = InMemoryCalendar::new();
        storage.insert(master());

        let position = Utc.with_ymd_and_hms(2025, 3, 21, 9, 0, 0).unwrap();
        let mut exception = Appointment::new("uid-1", "Series");
        exception.recurrence_date_position = Some(position);
        exception.start = Some(Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, 0).unwrap());
        exception.end = Some(Utc.with_ymd_and_hms(2025, 3, 21, 15, 0, 0).unwrap());

        let analysis = analyze(&add_message(exception), &storage, &session()).unwrap();
        assert_eq!(analysis.changes.len(), 1);
        let change = &analysis.changes[0];
        assert_eq!(change.kind, ChangeKind::Create);
        assert!(change.is_exception);
        let diff = change.diff.as_ref().expect("moved occurrence has a diff");
        assert!(diff.iter().any(|c| c.field == crate::diff::AppointmentField::Start));
    }

    #[test]
    fn test_add_colliding_with_existing_exception_offers_replace() {
        let position = Utc.with_ymd_and_hms(2025, 3, 21, 9, 0, 0).unwrap();
        let mut storage = InMemoryCalendar::new();
        storage.insert(master());
        let mut existing = Appointment::new("uid-1", "Already moved");
        existing.recurrence_date_position = Some(position);
        storage.insert(existing);

        let mut incoming = Appointment::new("uid-1", "Moved again");
        incoming.recurrence_date_position = Some(position);

        let analysis = analyze(&add_message(incoming), &storage, &session()).unwrap();
        assert_eq!(analysis.changes.len(), 1);
        assert_eq!(analysis.changes[0].kind, ChangeKind::Update);
        assert_eq!(
            analysis.actions.iter().copied().collect::<Vec<_>>(),
            vec![Action::AcceptAndReplace, Action::Ignore]
        );
    }
}
