//! Error types for the wire protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Body is not valid JSON for the expected message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A field holds a value the model cannot represent.
    #[error("invalid field `{field}`: {message}")]
    InvalidField {
        /// Field name on the wire.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The path does not name a known endpoint.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),
}

impl ProtocolError {
    /// Creates an invalid-field error.
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}
