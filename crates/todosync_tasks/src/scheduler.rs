//! Bounded-concurrency scheduler.

use crate::error::{TaskError, TaskResult};
use crate::task::{Task, TaskState};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, trace, warn};

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of task bodies executing at once. Never below 1.
    pub max_concurrency: usize,
    /// Upper bound on a single body's run time. `None` waits forever.
    pub task_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            task_timeout: None,
        }
    }
}

impl SchedulerConfig {
    /// Sets the concurrency limit (clamped to at least 1).
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Sets the per-task timeout.
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Removes the per-task timeout.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.task_timeout = None;
        self
    }
}

/// Counters describing scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks accepted by [`Scheduler::submit`].
    pub submitted: u64,
    /// Tasks whose body ran to completion (with or without a result).
    pub completed: u64,
    /// Tasks cancelled before their body started.
    pub cancelled: u64,
    /// Bodies abandoned after exceeding the timeout.
    pub timed_out: u64,
    /// Bodies that panicked.
    pub panicked: u64,
    /// Bodies executing right now.
    pub running: usize,
    /// Submitted tasks that have not finished yet.
    pub outstanding: usize,
}

struct SchedulerInner {
    handle: Handle,
    permits: Arc<Semaphore>,
    config: SchedulerConfig,
    outstanding: watch::Sender<usize>,
    submitted: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
    timed_out: AtomicU64,
    panicked: AtomicU64,
}

/// Runs tasks once their predecessors have finished.
///
/// At most `max_concurrency` bodies execute at the same time; everything
/// else waits. The scheduler is a cheap handle and can be cloned freely.
/// Submission never blocks the caller.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Creates a scheduler on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NoRuntime`] when called outside a runtime.
    pub fn new(config: SchedulerConfig) -> TaskResult<Self> {
        let handle = Handle::try_current().map_err(|_| TaskError::NoRuntime)?;
        Ok(Self::with_handle(handle, config))
    }

    /// Creates a scheduler that spawns onto the given runtime.
    pub fn with_handle(handle: Handle, config: SchedulerConfig) -> Self {
        let config = SchedulerConfig {
            max_concurrency: config.max_concurrency.max(1),
            ..config
        };
        let (outstanding, _) = watch::channel(0);
        Self {
            inner: Arc::new(SchedulerInner {
                handle,
                permits: Arc::new(Semaphore::new(config.max_concurrency)),
                config,
                outstanding,
                submitted: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                cancelled: AtomicU64::new(0),
                timed_out: AtomicU64::new(0),
                panicked: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the configuration in effect.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Accepts a task for execution.
    ///
    /// Returns immediately. The task starts once all its predecessors are
    /// finished and a concurrency slot is free.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::AlreadySubmitted`] if the task was submitted
    /// before, to this or any other scheduler.
    pub fn submit<T: Send + Sync + 'static>(&self, task: &Task<T>) -> TaskResult<()> {
        if !task.mark_submitted() {
            return Err(TaskError::AlreadySubmitted {
                name: task.name().to_string(),
            });
        }

        self.inner.submitted.fetch_add(1, Ordering::Relaxed);
        self.inner.outstanding.send_modify(|n| *n += 1);
        trace!(task = %task.name(), id = %task.id(), "task submitted");

        let inner = Arc::clone(&self.inner);
        let task = task.clone();
        self.inner.handle.spawn(async move {
            inner.run(task).await;
        });
        Ok(())
    }

    /// Number of bodies executing right now.
    pub fn running(&self) -> usize {
        self.inner.config.max_concurrency - self.inner.permits.available_permits()
    }

    /// Number of submitted tasks not yet finished.
    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.borrow()
    }

    /// Waits until every submitted task has finished.
    ///
    /// Tasks submitted while waiting are waited for too.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Returns a snapshot of the activity counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.inner.submitted.load(Ordering::Relaxed),
            completed: self.inner.completed.load(Ordering::Relaxed),
            cancelled: self.inner.cancelled.load(Ordering::Relaxed),
            timed_out: self.inner.timed_out.load(Ordering::Relaxed),
            panicked: self.inner.panicked.load(Ordering::Relaxed),
            running: self.running(),
            outstanding: self.outstanding(),
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.inner.config)
            .field("running", &self.running())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

impl SchedulerInner {
    async fn run<T: Send + Sync + 'static>(self: Arc<Self>, task: Task<T>) {
        self.execute(&task).await;
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }

    async fn execute<T: Send + Sync + 'static>(&self, task: &Task<T>) {
        let predecessors = task.predecessors();
        let ready = async {
            for dep in &predecessors {
                let mut rx = dep.subscribe();
                let _ = rx.wait_for(|state| *state == TaskState::Finished).await;
            }
        };
        // A cancelled task must not stay outstanding behind its predecessors.
        tokio::select! {
            _ = ready => {}
            _ = task.finished() => {}
        }

        let permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
            _ = task.finished() => None,
        };
        let Some(permit) = permit else {
            self.cancelled.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if !task.try_start() {
            self.cancelled.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let Some(body) = task.take_body() else {
            task.finish(None);
            return;
        };

        debug!(task = %task.name(), id = %task.id(), "task started");
        let mut join = self.handle.spawn(async move { body().await });
        let joined = match self.config.task_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut join).await {
                Ok(joined) => joined,
                Err(_) => {
                    join.abort();
                    warn!(
                        task = %task.name(),
                        timeout_ms = limit.as_millis() as u64,
                        "task timed out"
                    );
                    self.timed_out.fetch_add(1, Ordering::Relaxed);
                    task.finish(None);
                    drop(permit);
                    return;
                }
            },
            None => join.await,
        };

        let value = match joined {
            Ok(value) => value,
            Err(err) => {
                if err.is_panic() {
                    self.panicked.fetch_add(1, Ordering::Relaxed);
                }
                warn!(task = %task.name(), error = %err, "task body failed");
                None
            }
        };
        self.completed.fetch_add(1, Ordering::Relaxed);
        task.finish(value);
        drop(permit);
        debug!(task = %task.name(), id = %task.id(), "task finished");
    }
}
