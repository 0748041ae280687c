//! Analyzer for REQUEST, COUNTER and PUBLISH: reconcile an incoming
//! master/occurrence and its exceptions against stored state.

use tracing::debug;

use crate::analysis::{Analysis, Annotation, Change, ChangeKind};
use crate::analyzer::{find_by_position, MethodAnalyzer};
use crate::diff::diff_appointments;
use crate::error::ItipResult;
use crate::event::Appointment;
use crate::message::{ItipMessage, ItipMethod};
use crate::storage::{CalendarLookup, Session};

/// Shown when the stored appointment outversions the incoming one.
pub const STALE_UPDATE_MESSAGE: &str =
    "This is an update to an appointment that has been changed in the meantime. Best ignore it.";

const UNKNOWN_OCCURRENCE_MESSAGE: &str =
    "Got a change to an occurrence of an appointment that could not be found. \
     It was probably deleted in the meantime.";

pub struct UpdateAnalyzer;

impl MethodAnalyzer for UpdateAnalyzer {
    fn methods(&self) -> &'static [ItipMethod] {
        &[ItipMethod::Request, ItipMethod::Counter, ItipMethod::Publish]
    }

    fn analyze(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
    ) -> ItipResult<Analysis> {
        let mut analysis = Analysis::new();
        let uid = message.uid().unwrap_or_default();
        let stored_master = storage.resolve_uid(uid, session)?;
        let incoming_master = message.appointment.as_ref();

        // Staleness first, short-circuiting any conflict computation: a
        // lower incoming sequence means the sender worked off an old copy.
        if let (Some(stored), Some(incoming)) = (&stored_master, incoming_master) {
            if stored.sequence > incoming.sequence {
                debug!(
                    uid,
                    stored = stored.sequence,
                    incoming = incoming.sequence,
                    "stale update"
                );
                let mut change = Change::new(ChangeKind::Update);
                change.diff = Some(diff_appointments(stored, incoming));
                change.current_appointment = Some(stored.clone());
                change.new_appointment = Some(incoming.clone());
                analysis.push_change(change);
                analysis.annotate(Annotation::with_appointment(
                    STALE_UPDATE_MESSAGE,
                    stored.clone(),
                ));
                analysis.stale = true;
                return Ok(analysis);
            }
        }

        match &stored_master {
            None => self.analyze_unknown(message, storage, session, &mut analysis)?,
            Some(stored) => {
                self.analyze_known(message, storage, session, stored, &mut analysis)?
            }
        }

        Ok(analysis)
    }
}

impl UpdateAnalyzer {
    /// No stored master: everything in the message is new.
    fn analyze_unknown(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
        analysis: &mut Analysis,
    ) -> ItipResult<()> {
        let Some(incoming) = message.appointment.as_ref() else {
            // Occurrence-only message for a series we do not know.
            analysis.annotate(Annotation::new(UNKNOWN_OCCURRENCE_MESSAGE));
            analysis.recommend(crate::analysis::Action::Ignore);
            return Ok(());
        };

        let mut change = Change::new(ChangeKind::Create);
        change.conflicts = storage.conflicts(incoming, session)?;
        change.new_appointment = Some(incoming.clone());
        analysis.push_change(change);

        for exception in &message.exceptions {
            let mut change = Change::new(ChangeKind::Create);
            change.is_exception = true;
            change.master_appointment = Some(incoming.clone());
            change.conflicts = storage.conflicts(exception, session)?;
            change.new_appointment = Some(exception.clone());
            analysis.push_change(change);
        }
        Ok(())
    }

    /// Stored master exists: update it, reconcile exceptions both ways.
    fn analyze_known(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
        stored: &Appointment,
        analysis: &mut Analysis,
    ) -> ItipResult<()> {
        let stored_exceptions = storage.exceptions(stored, session)?;
        let incoming_master = message.appointment.as_ref();

        if let Some(incoming) = incoming_master {
            let mut change = Change::new(ChangeKind::Update);
            change.current_appointment = Some(stored.clone());
            change.diff = Some(diff_appointments(stored, incoming));
            change.conflicts = storage.conflicts(incoming, session)?;
            change.new_appointment = Some(incoming.clone());
            analysis.push_change(change);
        }

        for exception in &message.exceptions {
            let Some(position) = exception.recurrence_date_position else {
                continue;
            };
            match find_by_position(&stored_exceptions, position) {
                None => {
                    let mut change = Change::new(ChangeKind::Create);
                    change.is_exception = true;
                    change.master_appointment =
                        Some(incoming_master.unwrap_or(stored).clone());
                    change.conflicts = storage.conflicts(exception, session)?;
                    change.new_appointment = Some(exception.clone());
                    analysis.push_change(change);
                }
                Some(matched) => {
                    // The diff may be empty when only bookkeeping moved;
                    // the change is still emitted so an update can be
                    // offered, it just carries nothing to display.
                    let mut change = Change::new(ChangeKind::Update);
                    change.is_exception = true;
                    change.master_appointment = Some(stored.clone());
                    change.current_appointment = Some(matched.clone());
                    change.diff = Some(diff_appointments(matched, exception));
                    change.conflicts = storage.conflicts(exception, session)?;
                    change.new_appointment = Some(exception.clone());
                    analysis.push_change(change);
                }
            }
        }

        // A full-series message that omits a stored exception means the
        // sender reverted that occurrence to the series default.
        if incoming_master.is_some() {
            for stored_exception in &stored_exceptions {
                let still_present = stored_exception
                    .recurrence_date_position
                    .is_some_and(|position| {
                        find_by_position(&message.exceptions, position).is_some()
                    });
                if !still_present {
                    let mut change = Change::new(ChangeKind::Delete);
                    change.is_exception = true;
                    change.master_appointment = Some(stored.clone());
                    change.deleted_appointment = Some(stored_exception.clone());
                    analysis.push_change(change);
                }
            }
        }

        Ok(())
    }
}
