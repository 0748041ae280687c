//! Analyzer for CANCEL: delete a series, a stored exception, or mark a
//! still-virtual occurrence as deleted.

use crate::analysis::{Action, Analysis, Annotation, Change, ChangeKind};
use crate::analyzer::{find_by_position, MethodAnalyzer};
use crate::error::ItipResult;
use crate::event::Appointment;
use crate::message::{ItipMessage, ItipMethod};
use crate::storage::{CalendarLookup, Session};

const UNKNOWN_MASTER_MESSAGE: &str =
    "Got a cancellation for an appointment that could not be found. \
     It was probably already deleted.";

pub struct CancelAnalyzer;

impl MethodAnalyzer for CancelAnalyzer {
    fn methods(&self) -> &'static [ItipMethod] {
        &[ItipMethod::Cancel]
    }

    fn analyze(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
    ) -> ItipResult<Analysis> {
        let mut analysis = Analysis::new();
        let uid = message.uid().unwrap_or_default();

        let Some(master) = storage.resolve_uid(uid, session)? else {
            analysis.annotate(Annotation::new(UNKNOWN_MASTER_MESSAGE));
            analysis.recommend(Action::Ignore);
            return Ok(analysis);
        };

        // A master payload without a recurrence date position cancels the
        // whole series.
        if let Some(appointment) = &message.appointment {
            if appointment.recurrence_date_position.is_none() {
                let mut change = Change::new(ChangeKind::Delete);
                change.deleted_appointment = Some(master.clone());
                analysis.push_change(change);
                return Ok(analysis);
            }
        }

        let stored_exceptions = storage.exceptions(&master, session)?;

        // Occurrence-level cancels: the master payload with a position,
        // plus every exception payload.
        let occurrences = message
            .appointment
            .iter()
            .chain(message.exceptions.iter())
            .filter(|a| a.recurrence_date_position.is_some());

        for occurrence in occurrences {
            let position = occurrence
                .recurrence_date_position
                .expect("filtered on position above");
            match find_by_position(&stored_exceptions, position) {
                Some(stored_exception) => {
                    // Materialized override: delete the stored row.
                    let mut change = Change::new(ChangeKind::Delete);
                    change.is_exception = true;
                    change.master_appointment = Some(master.clone());
                    change.deleted_appointment = Some(stored_exception.clone());
                    analysis.push_change(change);
                }
                None => {
                    // Still virtual: ask for a delete-exception marker on
                    // the master instead of deleting a stored row.
                    let mut deleted =
                        Appointment::new(master.uid.clone(), master.summary.clone());
                    deleted.recurrence_date_position = Some(position);
                    let mut change = Change::new(ChangeKind::CreateDeleteException);
                    change.is_exception = true;
                    change.master_appointment = Some(master.clone());
                    change.current_appointment = Some(master.clone());
                    change.deleted_appointment = Some(deleted);
                    analysis.push_change(change);
                }
            }
        }

        Ok(analysis)
    }
}
