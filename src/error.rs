//! Error types for redreader.

use thiserror::Error;

/// Common error type for redreader.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Network or transport failure while fetching a source.
    ///
    /// Covers connection errors, timeouts, non-success HTTP statuses and
    /// oversized bodies. These are only retried by the next scheduled cycle.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Malformed source payload (feed XML or aggregator JSON).
    #[error("parse error: {0}")]
    Parse(String),

    /// Store unavailable or write failure.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for input such as feed URLs.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Scheduler lifecycle misuse (e.g. starting twice).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// A task panicked inside a fault boundary.
    #[error("panic in {0}")]
    Panic(String),
}

impl ReaderError {
    /// Whether the next scheduled cycle may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReaderError::Fetch(_) | ReaderError::Persistence(_))
    }
}

impl From<sqlx::Error> for ReaderError {
    fn from(e: sqlx::Error) -> Self {
        ReaderError::Persistence(e.to_string())
    }
}

/// Result type alias for redreader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;
