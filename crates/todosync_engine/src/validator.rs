//! Read-repair consistency checks.
//!
//! A check pairs a value computed synchronously from the local cache with
//! the same value computed asynchronously from the remote store. The
//! comparison runs in its own task once the remote leg has finished, so the
//! caller never waits for it.

use std::fmt;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock};
use todosync_tasks::{Scheduler, Task, TaskResult};
use tracing::{debug, error};

/// Outcome of a consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Local and remote values are equal.
    Consistent,
    /// Local and remote values differ.
    Diverged,
    /// No remote value arrived, so nothing was compared.
    Indeterminate,
}

impl Verdict {
    /// Returns the lowercase name of the verdict.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Consistent => "consistent",
            Verdict::Diverged => "diverged",
            Verdict::Indeterminate => "indeterminate",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expected value waiting for its remote counterpart.
#[derive(Debug)]
pub struct ConsistencyCheck<T> {
    expected: T,
    actual: OnceLock<T>,
}

impl<T: PartialEq + Debug> ConsistencyCheck<T> {
    /// Creates a check for `expected`.
    pub fn new(expected: T) -> Self {
        Self {
            expected,
            actual: OnceLock::new(),
        }
    }

    /// Returns the locally computed value.
    pub fn expected(&self) -> &T {
        &self.expected
    }

    /// Returns the remote value, if it has arrived.
    pub fn actual(&self) -> Option<&T> {
        self.actual.get()
    }

    /// Stores the remote value. Returns false if one was already stored.
    pub fn set_actual(&self, actual: T) -> bool {
        self.actual.set(actual).is_ok()
    }

    /// Compares the two values.
    pub fn verdict(&self) -> Verdict {
        match self.actual.get() {
            None => Verdict::Indeterminate,
            Some(actual) if *actual == self.expected => Verdict::Consistent,
            Some(_) => Verdict::Diverged,
        }
    }
}

/// Schedules a read-repair check.
///
/// Builds `fetch → transfer → decision`: the transfer step copies the
/// fetch result into the check, the decision step compares it with
/// `expected` and calls `on_diverged(expected, actual)` on mismatch. An
/// empty fetch slot is [`Verdict::Indeterminate`] and only logged.
///
/// `fetch` may be of any task shape and is submitted here unless the caller
/// already did. Returns the decision task; its result is the verdict.
pub fn read_repair<T, F>(
    scheduler: &Scheduler,
    expected: T,
    fetch: Task<T>,
    on_diverged: F,
) -> TaskResult<Task<Verdict>>
where
    T: PartialEq + Debug + Clone + Send + Sync + 'static,
    F: FnOnce(&T, &T) + Send + 'static,
{
    let check = Arc::new(ConsistencyCheck::new(expected));
    let label = fetch.name().to_string();

    let transfer = {
        let check = Arc::clone(&check);
        let source = fetch.clone();
        Task::from_fn(format!("{label}/transfer"), move || match source.result() {
            Some(actual) => check.set_actual(actual.clone()),
            None => false,
        })
    };
    transfer.add_dependency(&fetch)?;

    let decision = {
        let label = label.clone();
        Task::from_fn(format!("{label}/decide"), move || {
            let verdict = check.verdict();
            debug!(
                check = %label,
                expected = ?check.expected(),
                actual = ?check.actual(),
                %verdict,
                "read-repair compared"
            );
            match (verdict, check.actual()) {
                (Verdict::Diverged, Some(actual)) => {
                    error!(check = %label, "local cache diverged from remote");
                    on_diverged(check.expected(), actual);
                }
                (Verdict::Indeterminate, _) => {
                    debug!(check = %label, "no remote result, cannot verify");
                }
                _ => {}
            }
            verdict
        })
    };
    decision.add_dependency(&transfer)?;

    if !fetch.is_submitted() {
        scheduler.submit(&fetch)?;
    }
    scheduler.submit(&transfer)?;
    scheduler.submit(&decision)?;
    Ok(decision)
}
