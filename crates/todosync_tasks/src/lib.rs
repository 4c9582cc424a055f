//! # todosync tasks
//!
//! Dependency-ordered task graph and bounded-concurrency scheduler.
//!
//! This crate provides:
//! - [`Task`], a unit of deferred work with predecessor edges and a
//!   write-once result slot
//! - [`Scheduler`], which runs submitted tasks on a tokio runtime with at
//!   most `max_concurrency` bodies in flight
//!
//! ## Task shapes
//!
//! Every body is reduced to one boxed future yielding `Option<T>`:
//! asynchronous closures ([`Task::new`]), cheap synchronous steps
//! ([`Task::from_fn`]), blocking calls ([`Task::blocking`]) and
//! callback-style operations ([`Task::from_callback`]).
//!
//! ## Key Invariants
//!
//! - A task starts only after every predecessor has finished
//! - A task's result is readable only once it has finished
//! - Cancelling a pending task finishes it without running its body
//! - Failed, panicked and timed-out bodies finish with an empty slot, so
//!   dependents are always released

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod scheduler;
mod task;

pub use error::{TaskError, TaskResult};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats};
pub use task::{Completion, Dependency, Task, TaskFuture, TaskId, TaskState};
