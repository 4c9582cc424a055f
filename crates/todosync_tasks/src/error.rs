//! Error types for the task scheduler.

use thiserror::Error;

/// Result type for task and scheduler operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors that can occur when building or submitting tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task was already handed to a scheduler.
    #[error("task `{name}` was already submitted")]
    AlreadySubmitted {
        /// Task name.
        name: String,
    },

    /// A task was made to depend on itself.
    #[error("task `{name}` cannot depend on itself")]
    SelfDependency {
        /// Task name.
        name: String,
    },

    /// No tokio runtime is available to run tasks on.
    #[error("no tokio runtime available")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TaskError::AlreadySubmitted {
            name: "fetch".into(),
        };
        assert_eq!(err.to_string(), "task `fetch` was already submitted");
        assert_eq!(TaskError::NoRuntime.to_string(), "no tokio runtime available");
    }
}
