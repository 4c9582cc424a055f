//! Error types for the sync engine.

use thiserror::Error;
use todosync_core::{CoreError, Revision};
use todosync_protocol::ProtocolError;
use todosync_tasks::TaskError;

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors reported by a remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request could not be built because a credential is missing.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// The backend rejected the request's last-known revision.
    #[error("unsynchronized revision: client sent {sent}")]
    UnsynchronizedRevision {
        /// Revision the client sent.
        sent: Revision,
    },

    /// The target item does not exist remotely.
    #[error("item not found")]
    NotFound,

    /// The backend refused the credential.
    #[error("unauthorized")]
    Unauthorized,

    /// The backend replied with a body that could not be decoded.
    #[error("decode failure: {0}")]
    Decode(String),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// A non-success status without a more specific meaning.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The backend refused the request for another reason.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The operation timed out.
    #[error("operation timed out")]
    Timeout,
}

impl RemoteError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Transport { retryable, .. } => *retryable,
            RemoteError::Timeout => true,
            RemoteError::Status(code) => *code >= 500,
            _ => false,
        }
    }

    /// Returns true if the request lost an optimistic-concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::UnsynchronizedRevision { .. })
    }
}

impl From<ProtocolError> for RemoteError {
    fn from(err: ProtocolError) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

/// Result type for facade operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur setting up or driving the facade.
///
/// Remote failures on the write and read-repair paths are never surfaced
/// here; they are logged and counted in [`SyncStats`](crate::SyncStats).
#[derive(Error, Debug)]
pub enum SyncError {
    /// Task graph or scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] TaskError),

    /// Local cache error.
    #[error("local cache error: {0}")]
    Core(#[from] CoreError),

    /// Remote store error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(RemoteError::transport_retryable("connection lost").is_retryable());
        assert!(!RemoteError::transport_fatal("bad url").is_retryable());
        assert!(RemoteError::Timeout.is_retryable());
        assert!(RemoteError::Status(503).is_retryable());
        assert!(!RemoteError::Status(418).is_retryable());
        assert!(!RemoteError::NotFound.is_retryable());
        assert!(!RemoteError::UnsynchronizedRevision {
            sent: Revision::new(1)
        }
        .is_retryable());
    }

    #[test]
    fn error_display() {
        let err = RemoteError::UnsynchronizedRevision {
            sent: Revision::new(4),
        };
        assert_eq!(err.to_string(), "unsynchronized revision: client sent rev:4");
        assert!(err.is_conflict());

        let err = SyncError::from(TaskError::NoRuntime);
        assert_eq!(err.to_string(), "scheduler error: no tokio runtime available");
    }
}
