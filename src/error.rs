//! Error types for the iTip analysis engine.

use thiserror::Error;

use crate::message::ItipMethod;

/// Errors that can occur while analyzing a scheduling message.
///
/// Business-rule non-matches (unknown UID, stale sequence, unmatched
/// exception) are NOT errors; they produce annotations on the analysis.
#[derive(Error, Debug)]
pub enum ItipError {
    /// A calendar storage lookup failed. Propagated unchanged from the
    /// `CalendarLookup` collaborator, fatal to the current analysis.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The message violates the caller contract (e.g. a CANCEL naming
    /// neither an appointment nor any exception).
    #[error("Malformed iTip message: {0}")]
    MalformedMessage(String),

    /// No analyzer is registered for the message's method.
    #[error("Unsupported iTip method: {0}")]
    UnsupportedMethod(ItipMethod),
}

/// Result type alias for analysis operations.
pub type ItipResult<T> = Result<T, ItipError>;
