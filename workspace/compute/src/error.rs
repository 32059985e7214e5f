use chrono::NaiveDate;
use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the data access collaborator
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Expanding a recurring series produced no dates inside the window.
    ///
    /// Surfaced as a rejected operation rather than a silently empty list:
    /// callers that create a new series expect at least one occurrence.
    #[error("No occurrences between {window_start} and {window_end} for series anchored at {anchor}")]
    NoOccurrencesInRange {
        anchor: NaiveDate,
        window_start: NaiveDate,
        window_end: NaiveDate,
    },

    /// Error from the insight cache store
    #[error("Cache error: {0}")]
    Cache(String),

    /// Error from the external text formatter
    #[error("Formatter error: {0}")]
    Formatter(String),
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
