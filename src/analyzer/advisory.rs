//! Annotation-only analyzers for REFRESH and DECLINECOUNTER.
//!
//! Both methods communicate sender-side state rather than calendar
//! mutations, so neither ever emits a change.

use crate::analysis::{Action, Analysis, Annotation};
use crate::analyzer::{find_by_position, MethodAnalyzer};
use crate::error::{ItipError, ItipResult};
use crate::event::Appointment;
use crate::message::{ItipMessage, ItipMethod};
use crate::storage::{CalendarLookup, Session};

const REFRESH_FOUND_MESSAGE: &str =
    "A participant asked for the current state of this appointment.";
const REFRESH_UNKNOWN_MESSAGE: &str =
    "The appointment to refresh could not be found. It was probably deleted in the meantime.";

const DECLINECOUNTER_STALE_MESSAGE: &str =
    "The countered appointment has already been changed in the meantime. \
     Best ignore the decline.";
const DECLINECOUNTER_FOUND_MESSAGE: &str =
    "The organizer declined the counter proposal for this appointment.";
const DECLINECOUNTER_UNKNOWN_MESSAGE: &str =
    "The appointment belonging to the declined counter proposal could not be found.";

/// Resolve the appointment a message refers to: the stored exception
/// matching its recurrence date position, or the stored master.
fn resolve_reference(
    incoming: &Appointment,
    storage: &dyn CalendarLookup,
    session: &Session,
) -> ItipResult<Option<Appointment>> {
    let Some(master) = storage.resolve_uid(&incoming.uid, session)? else {
        return Ok(None);
    };
    if let Some(position) = incoming.recurrence_date_position {
        let exceptions = storage.exceptions(&master, session)?;
        if let Some(exception) = find_by_position(&exceptions, position) {
            return Ok(Some(exception.clone()));
        }
    }
    Ok(Some(master))
}

fn message_payload(message: &ItipMessage) -> ItipResult<&Appointment> {
    message
        .appointment
        .as_ref()
        .or_else(|| message.exceptions.first())
        .ok_or_else(|| {
            ItipError::MalformedMessage(format!("{} message carries no payload", message.method))
        })
}

pub struct RefreshAnalyzer;

impl MethodAnalyzer for RefreshAnalyzer {
    fn methods(&self) -> &'static [ItipMethod] {
        &[ItipMethod::Refresh]
    }

    fn analyze(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
    ) -> ItipResult<Analysis> {
        let mut analysis = Analysis::new();
        let incoming = message_payload(message)?;

        match resolve_reference(incoming, storage, session)? {
            Some(reference) => {
                analysis.annotate(Annotation::with_appointment(
                    REFRESH_FOUND_MESSAGE,
                    reference,
                ));
                analysis.recommend(Action::SendAppointment);
            }
            None => {
                analysis.annotate(Annotation::new(REFRESH_UNKNOWN_MESSAGE));
                analysis.recommend(Action::Ignore);
            }
        }

        Ok(analysis)
    }
}

pub struct DeclineCounterAnalyzer;

impl MethodAnalyzer for DeclineCounterAnalyzer {
    fn methods(&self) -> &'static [ItipMethod] {
        &[ItipMethod::DeclineCounter]
    }

    fn analyze(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
    ) -> ItipResult<Analysis> {
        let mut analysis = Analysis::new();
        let incoming = message_payload(message)?;

        match resolve_reference(incoming, storage, session)? {
            Some(reference) => {
                if reference.sequence > incoming.sequence {
                    // The appointment moved on since the counter was made;
                    // the decline refers to a proposal that is moot.
                    analysis.annotate(Annotation::with_appointment(
                        DECLINECOUNTER_STALE_MESSAGE,
                        reference,
                    ));
                    analysis.stale = true;
                } else {
                    analysis.annotate(Annotation::with_appointment(
                        DECLINECOUNTER_FOUND_MESSAGE,
                        reference,
                    ));
                    analysis.recommend(Action::Decline);
                    analysis.recommend(Action::Refresh);
                }
            }
            None => {
                analysis.annotate(Annotation::new(DECLINECOUNTER_UNKNOWN_MESSAGE));
                analysis.recommend(Action::Ignore);
                analysis.recommend(Action::Refresh);
            }
        }

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::storage::InMemoryCalendar;
    use chrono::{TimeZone, Utc};

    fn session() -> Session {
        Session::new(1, 1)
    }

    fn message_for(method: ItipMethod, appointment: Appointment) -> ItipMessage {
        let mut m = ItipMessage::new(method);
        m.appointment = Some(appointment);
        m
    }

    #[test]
    fn test_refresh_of_known_appointment_offers_send() {
        let mut storage = InMemoryCalendar::new();
        storage.insert(Appointment::new("uid-1", "Planning"));

        let message = message_for(ItipMethod::Refresh, Appointment::new("uid-1", "Planning"));
        let analysis = analyze(&message, &storage, &session()).unwrap();

        assert!(analysis.changes.is_empty());
        assert_eq!(analysis.annotations.len(), 1);
        assert!(analysis.annotations[0].appointment.is_some());
        assert_eq!(
            analysis.actions.iter().copied().collect::<Vec<_>>(),
            vec![Action::SendAppointment]
        );
    }

    #[test]
    fn test_refresh_of_unknown_appointment_is_ignore() {
        let storage = InMemoryCalendar::new();
        let message = message_for(ItipMethod::Refresh, Appointment::new("uid-gone", "X"));
        let analysis = analyze(&message, &storage, &session()).unwrap();

        assert_eq!(analysis.annotations[0].message, REFRESH_UNKNOWN_MESSAGE);
        assert_eq!(
            analysis.actions.iter().copied().collect::<Vec<_>>(),
            vec![Action::Ignore]
        );
    }

    #[test]
    fn test_refresh_resolves_matching_exception() {
        let position = Utc.with_ymd_and_hms(2025, 3, 21, 9, 0, 0).unwrap();
        let mut storage = InMemoryCalendar::new();
        storage.insert(Appointment::new("uid-1", "Series"));
        let mut exception = Appointment::new("uid-1", "Moved occurrence");
        exception.recurrence_date_position = Some(position);
        storage.insert(exception);

        let mut wanted = Appointment::new("uid-1", "Series");
        wanted.recurrence_date_position = Some(position);
        let message = message_for(ItipMethod::Refresh, wanted);

        let analysis = analyze(&message, &storage, &session()).unwrap();
        let referenced = analysis.annotations[0].appointment.as_ref().unwrap();
        assert_eq!(referenced.summary, "Moved occurrence");
    }

    #[test]
    fn test_declinecounter_on_current_appointment_offers_decline() {
        let mut storage = InMemoryCalendar::new();
        storage.insert(Appointment::new("uid-1", "Planning"));

        let message =
            message_for(ItipMethod::DeclineCounter, Appointment::new("uid-1", "Planning"));
        let analysis = analyze(&message, &storage, &session()).unwrap();

        assert_eq!(
            analysis.actions.iter().copied().collect::<Vec<_>>(),
            vec![Action::Decline, Action::Refresh]
        );
    }

    #[test]
    fn test_stale_declinecounter_is_ignore_only() {
        let mut storage = InMemoryCalendar::new();
        let mut stored = Appointment::new("uid-1", "Planning");
        stored.sequence = 4;
        storage.insert(stored);

        let mut countered = Appointment::new("uid-1", "Planning");
        countered.sequence = 2;
        let message = message_for(ItipMethod::DeclineCounter, countered);
        let analysis = analyze(&message, &storage, &session()).unwrap();

        assert_eq!(analysis.annotations[0].message, DECLINECOUNTER_STALE_MESSAGE);
        assert_eq!(
            analysis.actions.iter().copied().collect::<Vec<_>>(),
            vec![Action::Ignore]
        );
    }

    #[test]
    fn test_declinecounter_for_unknown_appointment_offers_refresh() {
        let storage = InMemoryCalendar::new();
        let message =
            message_for(ItipMethod::DeclineCounter, Appointment::new("uid-gone", "X"));
        let analysis = analyze(&message, &storage, &session()).unwrap();

        assert_eq!(
            analysis.actions.iter().copied().collect::<Vec<_>>(),
            vec![Action::Ignore, Action::Refresh]
        );
    }
}
