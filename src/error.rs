use std::error::Error as StdError;

use thiserror::Error;

/// Echoline's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Echoline's crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// A draft segment (or submit request) failed local validation.
    ///
    /// Always recoverable: callers surface it as a field-level message.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A collaborator failed to persist or load data.
    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

/// Reasons a draft segment cannot be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ValidationError {
    #[error("segment text must not be empty")]
    EmptyText,

    /// `end` must be strictly greater than `start`, and `start` must be non-negative.
    #[error("invalid time range: start {start}s, end {end}s")]
    InvalidRange { start: f64, end: f64 },

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("at least one segment is required")]
    NoSegments,
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Returns the validation failure, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_convert_and_round_trip_through_as_validation() {
        let err: Error = ValidationError::EmptyText.into();
        assert_eq!(err.as_validation(), Some(&ValidationError::EmptyText));
        assert_eq!(err.to_string(), "segment text must not be empty");
    }

    #[test]
    fn anyhow_errors_keep_their_context_chain() {
        let err: Error = anyhow::anyhow!("disk full").context("saving note").into();
        assert_eq!(err.to_string(), "saving note: disk full");
        assert!(err.as_validation().is_none());
    }
}
