//! Task graph nodes.

use crate::error::{TaskError, TaskResult};
use parking_lot::Mutex;
use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};
use uuid::Uuid;

/// A unique identifier for a task.
pub type TaskId = Uuid;

/// The boxed future every task body is reduced to.
///
/// `None` means the body produced no result.
pub type TaskFuture<T> = Pin<Box<dyn Future<Output = Option<T>> + Send + 'static>>;

pub(crate) type TaskBody<T> = Box<dyn FnOnce() -> TaskFuture<T> + Send + 'static>;

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created or submitted, body not started.
    Pending,
    /// Body is executing.
    Running,
    /// Body completed, or the task was cancelled before starting.
    Finished,
}

/// Anything a task can wait on.
///
/// Implemented by every [`Task`] regardless of its result type, so a task
/// can depend on predecessors producing different types.
pub trait Dependency: Send + Sync {
    /// Identifier of the predecessor.
    fn id(&self) -> TaskId;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> TaskState;

    /// Subscribes to state changes.
    fn subscribe(&self) -> watch::Receiver<TaskState>;
}

struct TaskInner<T> {
    id: TaskId,
    name: String,
    body: Mutex<Option<TaskBody<T>>>,
    result: OnceLock<T>,
    state: watch::Sender<TaskState>,
    predecessors: Mutex<Vec<Arc<dyn Dependency>>>,
    cancelled: AtomicBool,
    submitted: AtomicBool,
}

impl<T: Send + Sync + 'static> Dependency for TaskInner<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.subscribe()
    }
}

/// A unit of deferred work with explicit predecessors and a result slot.
///
/// `Task` is a cheap handle: clones refer to the same node. Build the task,
/// wire its dependencies, then hand it to a
/// [`Scheduler`](crate::Scheduler). Dependents read the predecessor's slot
/// with [`Task::result`] once it has finished.
///
/// # Example
///
/// ```rust
/// use todosync_tasks::{Scheduler, SchedulerConfig, Task};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
///
/// let fetch = Task::new("fetch", || async { Some(21) });
/// let fetched = fetch.clone();
/// let double = Task::from_fn("double", move || fetched.result().map(|v| v * 2));
/// double.add_dependency(&fetch).unwrap();
///
/// scheduler.submit(&fetch).unwrap();
/// scheduler.submit(&double).unwrap();
/// double.finished().await;
///
/// assert_eq!(double.result(), Some(&Some(42)));
/// # }
/// ```
pub struct Task<T> {
    inner: Arc<TaskInner<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> Task<T> {
    fn from_body(name: String, body: TaskBody<T>) -> Self {
        let (state, _) = watch::channel(TaskState::Pending);
        Self {
            inner: Arc::new(TaskInner {
                id: Uuid::new_v4(),
                name,
                body: Mutex::new(Some(body)),
                result: OnceLock::new(),
                state,
                predecessors: Mutex::new(Vec::new()),
                cancelled: AtomicBool::new(false),
                submitted: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a task from an asynchronous body.
    ///
    /// The body may span any number of await points; the task finishes only
    /// when the returned future resolves.
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        Self::from_body(name.into(), Box::new(move || Box::pin(body())))
    }

    /// Creates a task from a cheap synchronous step.
    ///
    /// The closure runs on a runtime worker; use [`Task::blocking`] for
    /// anything that may block.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self::new(name, move || future::ready(Some(f())))
    }

    /// Creates a task from a blocking call, run on the blocking pool.
    pub fn blocking<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self::new(name, move || async move {
            match tokio::task::spawn_blocking(f).await {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(task = %label, error = %err, "blocking task body failed");
                    None
                }
            }
        })
    }

    /// Creates a task from a callback-style operation.
    ///
    /// `f` receives a [`Completion`] and may hand it to any thread or
    /// callback. The task finishes when the completion is resolved; a
    /// completion dropped unresolved finishes the task with an empty slot.
    pub fn from_callback<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(Completion<T>) + Send + 'static,
    {
        Self::new(name, move || {
            let (tx, rx) = oneshot::channel();
            f(Completion { tx });
            async move { rx.await.ok() }
        })
    }

    /// Returns the task identifier.
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the current state.
    pub fn state(&self) -> TaskState {
        *self.inner.state.borrow()
    }

    /// Returns true if the task was cancelled before it started.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Returns true once the task was handed to a scheduler.
    pub fn is_submitted(&self) -> bool {
        self.inner.submitted.load(Ordering::SeqCst)
    }

    /// Returns the result slot.
    ///
    /// Always `None` before the task has finished. After that, `None`
    /// means the body produced nothing: it was cancelled, failed, panicked
    /// or timed out.
    pub fn result(&self) -> Option<&T> {
        if self.state() == TaskState::Finished {
            self.inner.result.get()
        } else {
            None
        }
    }

    /// Waits until the task has finished.
    ///
    /// Never resolves for a task that is never submitted or whose body never
    /// completes.
    pub async fn finished(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|state| *state == TaskState::Finished).await;
    }

    /// Makes this task wait for `other` to finish before starting.
    pub fn add_dependency<U: Send + Sync + 'static>(&self, other: &Task<U>) -> TaskResult<()> {
        if self.is_submitted() {
            return Err(TaskError::AlreadySubmitted {
                name: self.inner.name.clone(),
            });
        }
        if self.id() == other.id() {
            return Err(TaskError::SelfDependency {
                name: self.inner.name.clone(),
            });
        }
        self.inner.predecessors.lock().push(other.as_dependency());
        Ok(())
    }

    /// Builder form of [`Task::add_dependency`].
    pub fn with_dependency<U: Send + Sync + 'static>(self, other: &Task<U>) -> TaskResult<Self> {
        self.add_dependency(other)?;
        Ok(self)
    }

    /// Returns the ids of the task's predecessors.
    ///
    /// Edges are released once the task finishes, so long dependency chains
    /// do not keep finished tasks alive.
    pub fn dependencies(&self) -> Vec<TaskId> {
        self.inner.predecessors.lock().iter().map(|d| d.id()).collect()
    }

    /// Returns the task as a type-erased dependency.
    pub fn as_dependency(&self) -> Arc<dyn Dependency> {
        Arc::clone(&self.inner) as Arc<dyn Dependency>
    }

    /// Adds a type-erased predecessor.
    pub fn add_erased_dependency(&self, other: Arc<dyn Dependency>) -> TaskResult<()> {
        if self.is_submitted() {
            return Err(TaskError::AlreadySubmitted {
                name: self.inner.name.clone(),
            });
        }
        if other.id() == self.id() {
            return Err(TaskError::SelfDependency {
                name: self.inner.name.clone(),
            });
        }
        self.inner.predecessors.lock().push(other);
        Ok(())
    }

    /// Cancels the task if it has not started yet.
    ///
    /// A pending task goes straight to [`TaskState::Finished`] with an empty
    /// result slot and its body is dropped unrun. Returns false if the task
    /// is already running or finished; running bodies always complete.
    pub fn cancel(&self) -> bool {
        let inner = &self.inner;
        let cancelled = inner.state.send_if_modified(|state| {
            if *state == TaskState::Pending {
                inner.cancelled.store(true, Ordering::SeqCst);
                *state = TaskState::Finished;
                true
            } else {
                false
            }
        });
        if cancelled {
            inner.body.lock().take();
            inner.predecessors.lock().clear();
            debug!(task = %inner.name, id = %inner.id, "task cancelled before start");
        }
        cancelled
    }

    pub(crate) fn mark_submitted(&self) -> bool {
        !self.inner.submitted.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn predecessors(&self) -> Vec<Arc<dyn Dependency>> {
        self.inner.predecessors.lock().clone()
    }

    /// Moves a pending task to running. False if it was cancelled meanwhile.
    pub(crate) fn try_start(&self) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == TaskState::Pending {
                *state = TaskState::Running;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn take_body(&self) -> Option<TaskBody<T>> {
        self.inner.body.lock().take()
    }

    /// Fills the result slot, then publishes `Finished`.
    pub(crate) fn finish(&self, value: Option<T>) {
        if let Some(value) = value {
            let _ = self.inner.result.set(value);
        }
        self.inner.predecessors.lock().clear();
        self.inner.state.send_replace(TaskState::Finished);
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

/// Resolves a callback-style task.
///
/// Dropping it without calling [`Completion::complete`] finishes the task
/// with an empty result slot.
#[derive(Debug)]
pub struct Completion<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Completion<T> {
    /// Stores `value` in the task's result slot and lets the task finish.
    pub fn complete(self, value: T) {
        let _ = self.tx.send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_pending() {
        let task = Task::from_fn("noop", || 1);
        assert_eq!(task.state(), TaskState::Pending);
        assert!(task.result().is_none());
        assert!(!task.is_submitted());
    }

    #[test]
    fn cancel_pending_task() {
        let task = Task::from_fn("noop", || 1);
        assert!(task.cancel());
        assert_eq!(task.state(), TaskState::Finished);
        assert!(task.is_cancelled());
        assert!(task.result().is_none());

        // Second cancel is a no-op.
        assert!(!task.cancel());
    }

    #[test]
    fn self_dependency_rejected() {
        let task = Task::from_fn("loop", || ());
        let err = task.add_dependency(&task).unwrap_err();
        assert!(matches!(err, TaskError::SelfDependency { .. }));
    }

    #[test]
    fn dependencies_are_recorded() {
        let a = Task::from_fn("a", || 1u8);
        let b = Task::from_fn("b", || "b");
        let c = Task::from_fn("c", || ())
            .with_dependency(&a)
            .unwrap()
            .with_dependency(&b)
            .unwrap();

        assert_eq!(c.dependencies(), vec![a.id(), b.id()]);
    }

    #[test]
    fn dependency_after_submit_rejected() {
        let a = Task::from_fn("a", || ());
        let b = Task::from_fn("b", || ());
        assert!(b.mark_submitted());
        assert!(!b.mark_submitted());
        assert!(matches!(
            b.add_dependency(&a),
            Err(TaskError::AlreadySubmitted { .. })
        ));
    }

    #[test]
    fn result_hidden_until_finished() {
        let task = Task::from_fn("value", || 5);
        assert!(task.try_start());
        task.inner.result.set(5).unwrap();
        assert_eq!(task.state(), TaskState::Running);
        assert!(task.result().is_none());

        task.inner.state.send_replace(TaskState::Finished);
        assert_eq!(task.result(), Some(&5));
    }

    #[test]
    fn running_task_cannot_be_cancelled() {
        let task = Task::from_fn("busy", || ());
        assert!(task.try_start());
        assert!(!task.cancel());
        assert!(!task.is_cancelled());
    }
}
