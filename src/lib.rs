//! Analysis engine for iTip calendar scheduling messages.
//!
//! This crate interprets one parsed scheduling message (an invitation,
//! reply, cancellation, ...) against the recipient's stored calendar state
//! and produces a structured verdict:
//! - `Change`s: what would be created, updated or deleted
//! - `Annotation`s: human-facing explanations when no change applies
//! - `Action`s: what the user should be offered to do about it
//!
//! Calendar storage is abstracted behind the `CalendarLookup` trait;
//! `analyze` is the single entry point.

pub mod actions;
pub mod analysis;
pub mod analyzer;
pub mod diff;
pub mod error;
pub mod event;
pub mod message;
pub mod purge;
pub mod storage;

// Re-export the core types at crate root for convenience
pub use analysis::{
    Action, Analysis, Annotation, Change, ChangeKind, ParticipantChange, StatusTransition,
};
pub use analyzer::analyze;
pub use diff::{AppointmentField, FieldChange};
pub use error::{ItipError, ItipResult};
pub use event::{Appointment, Attendee, ParticipationStatus};
pub use message::{ItipMessage, ItipMethod};
pub use storage::{CalendarLookup, InMemoryCalendar, Session};
