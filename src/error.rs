//! Failure taxonomy for the execution pipeline.
//!
//! Three channels that must never be unified:
//! - a non-terminal [`OrderOutcome`](crate::venue::OrderOutcome) is a normal
//!   poll result, not an error;
//! - [`VenueError::Transport`] is retryable;
//! - everything else escalates.

use thiserror::Error;

/// Failure reported by a venue adapter.
#[derive(Debug, Error)]
pub enum VenueError {
    /// Transport or protocol failure talking to the venue. Retryable.
    #[error("{venue}: transport failure: {message}")]
    Transport { venue: String, message: String },

    /// The venue answered, but the response shape was not what the API
    /// contract promises. Not retried; surfaced immediately.
    #[error("{venue}: malformed response: {message}")]
    Validation { venue: String, message: String },

    /// The venue does not implement this capability.
    #[error("{venue}: {operation} is not supported")]
    NotSupported {
        venue: String,
        operation: &'static str,
    },
}

impl VenueError {
    pub fn transport(venue: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            venue: venue.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(venue: impl Into<String>, message: impl ToString) -> Self {
        Self::Validation {
            venue: venue.into(),
            message: message.to_string(),
        }
    }

    /// Whether a bounded retry loop may try this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Stage of the order lifecycle at which retries ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStage {
    /// Order creation never succeeded.
    Create,
    /// Polling (including the cancel-and-recheck phase) never resolved.
    Resolve,
}

impl std::fmt::Display for RetryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryStage::Create => write!(f, "create"),
            RetryStage::Resolve => write!(f, "resolve"),
        }
    }
}

/// Failure of a single order leg, fatal to the enclosing opportunity only.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// All attempts at the given stage failed.
    #[error("{stage} on {venue} exhausted after {attempts} attempts")]
    ExhaustedRetries {
        stage: RetryStage,
        venue: String,
        attempts: u32,
        #[source]
        last: VenueError,
    },

    /// A non-retryable venue error cut the stage short.
    #[error(transparent)]
    Venue(#[from] VenueError),

    /// The opportunity referenced a venue the engine does not know.
    #[error("unknown venue: {0}")]
    UnknownVenue(String),
}

/// Snapshot load/save failure. Logged, never fatal to the trading cycle.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot io failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot at {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
