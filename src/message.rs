//! Parsed iTip scheduling messages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::Appointment;

/// The iTip method of a scheduling message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItipMethod {
    Request,
    Reply,
    Cancel,
    Counter,
    DeclineCounter,
    Refresh,
    Add,
    Publish,
}

impl fmt::Display for ItipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItipMethod::Request => "REQUEST",
            ItipMethod::Reply => "REPLY",
            ItipMethod::Cancel => "CANCEL",
            ItipMethod::Counter => "COUNTER",
            ItipMethod::DeclineCounter => "DECLINECOUNTER",
            ItipMethod::Refresh => "REFRESH",
            ItipMethod::Add => "ADD",
            ItipMethod::Publish => "PUBLISH",
        };
        write!(f, "{}", s)
    }
}

/// One parsed scheduling payload, transport-independent. Built by an
/// upstream parsing layer; immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItipMessage {
    pub method: ItipMethod,
    /// The series master or single occurrence named by the message, if any.
    pub appointment: Option<Appointment>,
    /// Recurrence exceptions carried by the message, each identified by
    /// its recurrence date position.
    pub exceptions: Vec<Appointment>,
    /// Free text from the sender (e.g. a reply comment).
    pub comment: Option<String>,
}

impl ItipMessage {
    pub fn new(method: ItipMethod) -> Self {
        ItipMessage {
            method,
            appointment: None,
            exceptions: Vec::new(),
            comment: None,
        }
    }

    /// The scheduling UID this message is about, taken from the master
    /// payload or, failing that, the first exception.
    pub fn uid(&self) -> Option<&str> {
        self.appointment
            .as_ref()
            .or_else(|| self.exceptions.first())
            .map(|a| a.uid.as_str())
    }

    /// A message naming neither a master nor any exception cannot be
    /// analyzed; callers must not construct one.
    pub fn is_empty(&self) -> bool {
        self.appointment.is_none() && self.exceptions.is_empty()
    }
}
