//! Per-record error types.
//!
//! Neither error is fatal: the writer logs it, counts it and moves on to
//! the next line.

use thiserror::Error;

/// A line did not have the expected structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected {expected} '|'-delimited fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

/// The event time field could not be turned into a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid event time '{input}': {reason}")]
pub struct TimeFormatError {
    pub input: String,
    pub reason: String,
}

impl TimeFormatError {
    pub(crate) fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Any reason a single record is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    TimeFormat(#[from] TimeFormatError),
}

impl RecordError {
    /// Short label used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::TimeFormat(_) => "time_format",
        }
    }
}
