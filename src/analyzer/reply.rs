//! Analyzer for REPLY: merge an attendee's response into the stored
//! participant list, including participants we never invited.

use tracing::debug;

use crate::analysis::{
    Analysis, Annotation, Change, ChangeKind, ParticipantChange, StatusTransition,
};
use crate::analyzer::{find_by_position, MethodAnalyzer};
use crate::diff::diff_appointments;
use crate::error::{ItipError, ItipResult};
use crate::event::Appointment;
use crate::message::{ItipMessage, ItipMethod};
use crate::storage::{CalendarLookup, Session};

const UNKNOWN_MASTER_MESSAGE: &str =
    "Got a participant state change for an appointment that could not be found. \
     It was probably deleted in the meantime.";

pub struct ReplyAnalyzer;

impl MethodAnalyzer for ReplyAnalyzer {
    fn methods(&self) -> &'static [ItipMethod] {
        &[ItipMethod::Reply]
    }

    fn analyze(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
    ) -> ItipResult<Analysis> {
        let mut analysis = Analysis::new();

        let incoming = message
            .appointment
            .as_ref()
            .or_else(|| message.exceptions.first())
            .ok_or_else(|| {
                ItipError::MalformedMessage("REPLY message carries no payload".to_string())
            })?;

        let Some(master) = storage.resolve_uid(&incoming.uid, session)? else {
            analysis.annotate(Annotation::new(UNKNOWN_MASTER_MESSAGE));
            return Ok(analysis);
        };

        // A reply to one occurrence targets the stored exception when one
        // exists; otherwise the whole series takes the reply.
        let stored_exception = match incoming.recurrence_date_position {
            Some(position) => {
                let exceptions = storage.exceptions(&master, session)?;
                find_by_position(&exceptions, position).cloned()
            }
            None => None,
        };
        let (current, is_exception) = match &stored_exception {
            Some(exception) => (exception, true),
            None => (&master, false),
        };

        let (merged, participant_change) = merge_participants(current, incoming, message);

        let mut change = Change::new(ChangeKind::Update);
        change.is_exception = is_exception;
        if is_exception {
            change.master_appointment = Some(master.clone());
        }
        change.current_appointment = Some(current.clone());
        change.diff = Some(diff_appointments(current, &merged));
        change.new_appointment = Some(merged);
        change.participant_change = Some(participant_change);
        analysis.push_change(change);

        Ok(analysis)
    }
}

/// Merge the incoming participant list into the stored one: known
/// participants get their status and comment overwritten, unknown ones
/// (party crashers) are appended.
fn merge_participants(
    current: &Appointment,
    incoming: &Appointment,
    message: &ItipMessage,
) -> (Appointment, ParticipantChange) {
    let mut merged = current.clone();
    let mut participant_change = ParticipantChange {
        comment: message.comment.clone(),
        ..ParticipantChange::default()
    };

    for replier in &incoming.attendees {
        match merged
            .attendees
            .iter_mut()
            .find(|a| a.same_participant(replier))
        {
            Some(known) => {
                participant_change.transitions.push(StatusTransition {
                    email: replier.email.clone(),
                    from: known.participation,
                    to: replier.participation,
                });
                known.participation = replier.participation;
                known.comment = replier.comment.clone();
            }
            None => {
                debug!(email = %replier.email, "reply from unknown participant");
                participant_change.transitions.push(StatusTransition {
                    email: replier.email.clone(),
                    from: None,
                    to: replier.participation,
                });
                participant_change.party_crasher = true;
                merged.attendees.push(replier.clone());
            }
        }
    }

    (merged, participant_change)
}
