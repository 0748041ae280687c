//! Method analyzers and the `analyze` entry point.
//!
//! One analyzer exists per iTip method family; `analyze` picks the one
//! whose `methods()` contains the message's method, runs it, and then
//! post-processes the result (conflict purging, action recommendation)
//! before returning it.

mod add;
mod advisory;
mod cancel;
mod reply;
mod update;

use chrono::{DateTime, Utc};
use tracing::debug;

pub use add::AddAnalyzer;
pub use advisory::{DeclineCounterAnalyzer, RefreshAnalyzer};
pub use cancel::CancelAnalyzer;
pub use reply::ReplyAnalyzer;
pub use update::UpdateAnalyzer;

use crate::actions::recommend_actions;
use crate::analysis::Analysis;
use crate::error::{ItipError, ItipResult};
use crate::event::Appointment;
use crate::message::{ItipMessage, ItipMethod};
use crate::purge::purge_conflicts;
use crate::storage::{CalendarLookup, Session};

/// One analyzer per iTip method family.
pub trait MethodAnalyzer: Sync {
    /// The methods this analyzer handles.
    fn methods(&self) -> &'static [ItipMethod];

    /// Interpret `message` against stored calendar state and emit the
    /// raw changes and annotations. Conflict purging and action
    /// recommendation run afterwards, in `analyze`.
    fn analyze(
        &self,
        message: &ItipMessage,
        storage: &dyn CalendarLookup,
        session: &Session,
    ) -> ItipResult<Analysis>;
}

/// Registry of all analyzers, keyed by method via `analyzer_for`.
static ANALYZERS: &[&dyn MethodAnalyzer] = &[
    &UpdateAnalyzer,
    &AddAnalyzer,
    &CancelAnalyzer,
    &ReplyAnalyzer,
    &RefreshAnalyzer,
    &DeclineCounterAnalyzer,
];

/// Look up the analyzer responsible for `method`.
pub fn analyzer_for(method: ItipMethod) -> Option<&'static dyn MethodAnalyzer> {
    ANALYZERS
        .iter()
        .copied()
        .find(|a| a.methods().contains(&method))
}

/// Analyze one scheduling message against the recipient's calendar.
///
/// Returns the structured verdict: changes to apply, annotations to show,
/// and the set of actions the user should be offered.
pub fn analyze(
    message: &ItipMessage,
    storage: &dyn CalendarLookup,
    session: &Session,
) -> ItipResult<Analysis> {
    if message.is_empty() {
        return Err(ItipError::MalformedMessage(format!(
            "{} message names neither an appointment nor an exception",
            message.method
        )));
    }

    let analyzer = analyzer_for(message.method)
        .ok_or(ItipError::UnsupportedMethod(message.method))?;

    debug!(method = %message.method, uid = message.uid(), "analyzing scheduling message");
    let mut analysis = analyzer.analyze(message, storage, session)?;

    purge_conflicts(&mut analysis);
    recommend_actions(&mut analysis, message.method);

    debug!(
        changes = analysis.changes.len(),
        annotations = analysis.annotations.len(),
        ?analysis.actions,
        "analysis complete"
    );
    Ok(analysis)
}

/// Find the appointment whose recurrence date position exactly equals
/// `position`. Matching is exact instant equality.
pub(crate) fn find_by_position(
    appointments: &[Appointment],
    position: DateTime<Utc>,
) -> Option<&Appointment> {
    appointments
        .iter()
        .find(|a| a.recurrence_date_position == Some(position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryCalendar;

    #[test]
    fn test_every_method_has_exactly_one_analyzer() {
        let methods = [
            ItipMethod::Request,
            ItipMethod::Reply,
            ItipMethod::Cancel,
            ItipMethod::Counter,
            ItipMethod::DeclineCounter,
            ItipMethod::Refresh,
            ItipMethod::Add,
            ItipMethod::Publish,
        ];
        for method in methods {
            let count = ANALYZERS
                .iter()
                .filter(|a| a.methods().contains(&method))
                .count();
            assert_eq!(count, 1, "method {} must have one analyzer", method);
        }
    }

    #[test]
    fn test_empty_message_fails_fast() {
        let message = ItipMessage::new(ItipMethod::Cancel);
        let storage = InMemoryCalendar::new();
        let result = analyze(&message, &storage, &Session::new(1, 1));
        assert!(matches!(result, Err(ItipError::MalformedMessage(_))));
    }
}
