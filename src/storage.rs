//! Calendar storage collaborator.
//!
//! All calendar-state access of the engine goes through the
//! `CalendarLookup` trait: resolve a master by UID, list the stored
//! recurrence exceptions of a master, list time-overlapping appointments.
//! The engine treats every call as read-only and propagates storage
//! failures unchanged.

use serde::{Deserialize, Serialize};

use crate::error::ItipResult;
use crate::event::Appointment;

/// The acting user's context, passed through to storage untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub context_id: i32,
    pub user_id: i32,
}

impl Session {
    pub fn new(context_id: i32, user_id: i32) -> Self {
        Session {
            context_id,
            user_id,
        }
    }
}

/// Read-only calendar storage, as seen by the analyzers.
pub trait CalendarLookup {
    /// Look up the stored master/series object by scheduling UID.
    fn resolve_uid(&self, uid: &str, session: &Session) -> ItipResult<Option<Appointment>>;

    /// All stored recurrence exceptions belonging to `master`.
    fn exceptions(&self, master: &Appointment, session: &Session) -> ItipResult<Vec<Appointment>>;

    /// Stored appointments whose time range overlaps `candidate`,
    /// excluding the candidate's own stored counterpart.
    fn conflicts(&self, candidate: &Appointment, session: &Session) -> ItipResult<Vec<Appointment>>;
}

/// In-memory `CalendarLookup` over a flat appointment list. Doubles as
/// the test fixture for the engine and as a reference for adapter
/// implementations over real storage.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCalendar {
    appointments: Vec<Appointment>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        InMemoryCalendar::default()
    }

    /// Store an appointment, assigning an object id when it has none.
    pub fn insert(&mut self, mut appointment: Appointment) -> Appointment {
        if appointment.object_id.is_none() {
            appointment.object_id = Some(format!("{}", self.appointments.len() + 1));
        }
        self.appointments.push(appointment.clone());
        appointment
    }
}

impl CalendarLookup for InMemoryCalendar {
    fn resolve_uid(&self, uid: &str, _session: &Session) -> ItipResult<Option<Appointment>> {
        // The master is the stored object without a recurrence date position.
        Ok(self
            .appointments
            .iter()
            .find(|a| a.uid == uid && a.recurrence_date_position.is_none())
            .cloned())
    }

    fn exceptions(&self, master: &Appointment, _session: &Session) -> ItipResult<Vec<Appointment>> {
        Ok(self
            .appointments
            .iter()
            .filter(|a| a.uid == master.uid && a.recurrence_date_position.is_some())
            .cloned()
            .collect())
    }

    fn conflicts(&self, candidate: &Appointment, _session: &Session) -> ItipResult<Vec<Appointment>> {
        Ok(self
            .appointments
            .iter()
            .filter(|a| a.uid != candidate.uid && !a.same_object(candidate))
            .filter(|a| a.overlaps(candidate))
            .cloned()
            .collect())
    }
}
