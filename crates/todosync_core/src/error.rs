//! Error types for todosync core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error while reading or writing a cache file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Cache file contents are not valid JSON for the cache format.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A color string is not `#RRGGBB` or `#RRGGBBAA`.
    #[error("invalid color: {value}")]
    InvalidColor {
        /// The rejected input.
        value: String,
    },

    /// An item identifier could not be parsed.
    #[error("invalid item id: {value}")]
    InvalidId {
        /// The rejected input.
        value: String,
    },

    /// A priority name is not one of the known priorities.
    #[error("invalid priority: {value}")]
    InvalidPriority {
        /// The rejected input.
        value: String,
    },
}

impl CoreError {
    /// Returns true if this error came from the file system.
    pub fn is_io(&self) -> bool {
        matches!(self, CoreError::Io(_))
    }
}
