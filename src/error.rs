//! Error types for levelscan.

use std::io;
use thiserror::Error;

/// Result type alias for levelscan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for level iteration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// I/O error from reading an sstable.
    #[error("I/O error: {0}")]
    Io(String),

    /// Data corruption detected.
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// A table opener failed to construct iterators for a file.
    #[error("Table open failed for file {file_number}: {reason}")]
    TableOpen {
        /// File number of the table that failed to open.
        file_number: u64,
        /// Human-readable failure reason.
        reason: String,
    },

    /// An inner iterator failed mid-iteration.
    #[error("Iterator error: {0}")]
    IteratorError(String),

    /// Closing an iterator failed.
    #[error("Close error: {0}")]
    CloseError(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a corruption error with the given message.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        Error::Corruption(msg.into())
    }

    /// Create a table open error.
    pub fn table_open<S: Into<String>>(file_number: u64, reason: S) -> Self {
        Error::TableOpen {
            file_number,
            reason: reason.into(),
        }
    }

    /// Create an iterator error.
    pub fn iterator<S: Into<String>>(msg: S) -> Self {
        Error::IteratorError(msg.into())
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Check if this error indicates corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}

/// Compose two optional errors under "first error wins".
///
/// Used when tearing down several iterators in sequence: the earliest
/// failure is the one surfaced to the caller.
pub fn first_error(a: Option<Error>, b: Option<Error>) -> Option<Error> {
    a.or(b)
}
