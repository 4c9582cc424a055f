//! The synced storage facade.

use crate::config::SyncConfig;
use crate::error::{RemoteError, RemoteResult, SyncError, SyncResult};
use crate::notify::{AlertOption, InconsistencyAlert, SyncNotifier};
use crate::reconcile::{reconcile, SyncOutcome, SyncPipeline};
use crate::remote::{RemoteStore, Versioned};
use crate::revision::RevisionTracker;
use crate::validator::{read_repair, Verdict};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use todosync_core::{Item, ItemId, LocalStore, Revision, Snapshot};
use todosync_tasks::{Dependency, Scheduler, Task, TaskState};
use tracing::{debug, error, info, warn};

/// Counters describing facade activity.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Read-repair checks scheduled.
    pub checks_started: u64,
    /// Checks that found local and remote equal.
    pub checks_consistent: u64,
    /// Checks that found a divergence.
    pub checks_diverged: u64,
    /// Checks without a remote result.
    pub checks_indeterminate: u64,
    /// Remote mutations that succeeded.
    pub remote_writes_ok: u64,
    /// Remote mutations that failed (and were swallowed).
    pub remote_writes_failed: u64,
    /// `sync()` pipelines started.
    pub syncs_started: u64,
    /// `sync()` pipelines that reached the notify stage.
    pub syncs_finished: u64,
    /// Items written to the cache by reconciliation.
    pub items_reconciled: u64,
    /// Last remote error message.
    pub last_error: Option<String>,
    /// Last time a sync applied a snapshot.
    pub last_sync_time: Option<Instant>,
}

/// Whether a remote call reads or mutates the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Remote calls still in flight, in the order they were issued.
///
/// A read waits for the latest write. A write waits for the latest write
/// and for every read issued since, so a read never observes a mutation
/// issued after it.
#[derive(Default)]
struct RemoteOrder {
    last_write: Option<Arc<dyn Dependency>>,
    reads: Vec<Arc<dyn Dependency>>,
}

impl RemoteOrder {
    fn predecessors(&mut self, access: Access) -> Vec<Arc<dyn Dependency>> {
        self.reads.retain(|read| read.state() != TaskState::Finished);
        let mut predecessors: Vec<_> = self
            .last_write
            .iter()
            .filter(|write| write.state() != TaskState::Finished)
            .cloned()
            .collect();
        if access == Access::Write {
            predecessors.extend(self.reads.iter().cloned());
        }
        predecessors
    }

    fn record(&mut self, task: Arc<dyn Dependency>, access: Access) {
        match access {
            Access::Read => self.reads.push(task),
            Access::Write => {
                self.reads.clear();
                self.last_write = Some(task);
            }
        }
    }
}

struct Shared<L, R> {
    local: L,
    remote: R,
    notifier: Arc<dyn SyncNotifier>,
    scheduler: Scheduler,
    config: SyncConfig,
    revision: RevisionTracker,
    /// Serializes every local mutation, direct or scheduled.
    local_writes: Mutex<()>,
    remote_order: Mutex<RemoteOrder>,
    stats: Mutex<SyncStats>,
}

/// Local cache and remote store behind one API.
///
/// Every call is answered from the local cache and returns without waiting
/// for the network. Reads schedule a read-repair check against the remote
/// store; writes are propagated to the remote store in the background, in
/// call order. Remote outcomes surface only through the
/// [`SyncNotifier`] and [`SyncStats`].
///
/// # Example
///
/// ```rust
/// use todosync_core::{Item, MemoryCache};
/// use todosync_engine::{LogNotifier, MemoryRemote, SyncConfig, SyncedStorage};
///
/// # #[tokio::main]
/// # async fn main() {
/// let storage = SyncedStorage::new(
///     MemoryCache::new(),
///     MemoryRemote::new(),
///     LogNotifier,
///     SyncConfig::default(),
/// )
/// .unwrap();
///
/// let item = Item::new("buy milk");
/// storage.add(item.clone());
/// assert_eq!(storage.get(item.id), Some(item));
///
/// storage.scheduler().wait_idle().await;
/// assert_eq!(storage.remote().snapshot().len(), 1);
/// # }
/// ```
pub struct SyncedStorage<L: LocalStore, R: RemoteStore> {
    shared: Arc<Shared<L, R>>,
}

impl<L: LocalStore, R: RemoteStore> Clone for SyncedStorage<L, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<L: LocalStore, R: RemoteStore> SyncedStorage<L, R> {
    /// Creates a facade with its own scheduler on the current runtime.
    ///
    /// # Errors
    ///
    /// Fails outside a tokio runtime.
    pub fn new(
        local: L,
        remote: R,
        notifier: impl SyncNotifier,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let scheduler = Scheduler::new(config.scheduler_config())?;
        Ok(Self::with_scheduler(local, remote, notifier, config, scheduler))
    }

    /// Creates a facade that runs its tasks on a shared scheduler.
    ///
    /// The scheduler's own limits apply; `config.max_concurrency` and
    /// `config.task_timeout` are ignored.
    pub fn with_scheduler(
        local: L,
        remote: R,
        notifier: impl SyncNotifier,
        config: SyncConfig,
        scheduler: Scheduler,
    ) -> Self {
        let revision = RevisionTracker::new(config.initial_revision);
        Self {
            shared: Arc::new(Shared {
                local,
                remote,
                notifier: Arc::new(notifier),
                scheduler,
                config,
                revision,
                local_writes: Mutex::new(()),
                remote_order: Mutex::new(RemoteOrder::default()),
                stats: Mutex::new(SyncStats::default()),
            }),
        }
    }

    /// Returns every cached item and schedules a check of the whole list.
    ///
    /// The check compares id-ordered local items against the id-ordered
    /// remote snapshot.
    pub fn list(&self) -> Vec<Item> {
        let items = self.shared.local.list();
        let mut expected = items.clone();
        expected.sort_by_key(|item| item.id);

        let fetch = self.shared.remote_task("list/fetch", |shared| async move {
            match shared.remote.fetch_all().await {
                Ok(snapshot) => {
                    shared.revision.observe(snapshot.revision);
                    Some(snapshot.sorted_by_id())
                }
                Err(err) => {
                    shared.read_failed("list", &err);
                    None
                }
            }
        });
        self.shared.check(expected, fetch);
        items
    }

    /// Returns the cached item and schedules a check against the remote
    /// copy.
    ///
    /// A remote `NotFound` compares equal to a local miss.
    pub fn get(&self, id: ItemId) -> Option<Item> {
        let item = self.shared.local.get(id);

        let fetch = self.shared.remote_task("get/fetch", move |shared| async move {
            let base = shared.revision.current();
            match shared.remote.fetch_one(id, base).await {
                Ok(versioned) => {
                    shared.revision.observe(versioned.revision);
                    Some(Some(versioned.value))
                }
                Err(RemoteError::NotFound) => Some(None),
                Err(err) => {
                    shared.read_failed("get", &err);
                    None
                }
            }
        });
        self.shared.check(item.clone(), fetch);
        item
    }

    /// Adds an item locally and propagates it in the background.
    pub fn add(&self, item: Item) {
        {
            let _guard = self.shared.local_writes.lock();
            self.shared.local.add(item.clone());
        }
        debug!(item_id = %item.id, "item added locally");

        let write = self.shared.remote_task("add/create", move |shared| async move {
            let base = shared.revision.current();
            match shared.remote.create(item, base).await {
                Ok(versioned) => {
                    shared.remote_succeeded(versioned.revision);
                    Some(())
                }
                Err(err) => {
                    shared.write_failed("add", &err);
                    None
                }
            }
        });
        self.shared.chain_write(&write);
    }

    /// Replaces an item locally and remotely.
    ///
    /// Returns the local outcome. The remote outcome (`true` on success,
    /// `false` on `NotFound`) is checked against it in the background.
    pub fn update(&self, id: ItemId, item: Item) -> bool {
        let updated = {
            let _guard = self.shared.local_writes.lock();
            self.shared.local.update(id, item.clone())
        };

        let write = self.shared.remote_task("update/replace", move |shared| async move {
            let base = shared.revision.current();
            shared.outcome("update", shared.remote.replace(id, item, base).await)
        });
        if self.shared.chain_write(&write) {
            self.shared.check(updated, write);
        }
        updated
    }

    /// Removes an item locally and remotely.
    ///
    /// Returns the local outcome; the remote outcome is checked like
    /// [`SyncedStorage::update`].
    pub fn remove(&self, id: ItemId) -> bool {
        let removed = {
            let _guard = self.shared.local_writes.lock();
            self.shared.local.remove(id)
        };

        let write = self.shared.remote_task("remove/delete", move |shared| async move {
            let base = shared.revision.current();
            shared.outcome("remove", shared.remote.delete(id, base).await)
        });
        if self.shared.chain_write(&write) {
            self.shared.check(removed, write);
        }
        removed
    }

    /// Clears the local cache. The remote store is not touched.
    pub fn flush(&self) {
        let _guard = self.shared.local_writes.lock();
        self.shared.local.flush();
        debug!("local cache flushed");
    }

    /// Starts a full reconciliation and returns immediately.
    ///
    /// The returned pipeline can be awaited with
    /// [`SyncPipeline::finished`]; the notifier is told either way.
    pub fn sync(&self) -> SyncResult<SyncPipeline> {
        self.shared.start_sync()
    }

    /// Returns the last-known remote revision.
    pub fn last_known_revision(&self) -> Revision {
        self.shared.revision.current()
    }

    /// Returns a copy of the activity counters.
    pub fn stats(&self) -> SyncStats {
        self.shared.stats.lock().clone()
    }

    /// Returns the scheduler running this facade's tasks.
    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    /// Returns the local cache.
    pub fn local(&self) -> &L {
        &self.shared.local
    }

    /// Returns the remote store.
    pub fn remote(&self) -> &R {
        &self.shared.remote
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }
}

impl<L: LocalStore, R: RemoteStore> Shared<L, R> {
    fn remote_task<T, F, Fut>(self: &Arc<Self>, name: &str, body: F) -> Task<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let shared = Arc::clone(self);
        Task::new(name, move || body(shared))
    }

    /// Orders a remote call after the traffic issued before it.
    fn sequence<T>(&self, task: &Task<T>, access: Access) -> SyncResult<()>
    where
        T: Send + Sync + 'static,
    {
        let mut order = self.remote_order.lock();
        for previous in order.predecessors(access) {
            task.add_erased_dependency(previous)?;
        }
        order.record(task.as_dependency(), access);
        Ok(())
    }

    /// Queues a remote write behind earlier remote calls. Returns false if
    /// the write could not be scheduled.
    fn chain_write<T: Send + Sync + 'static>(&self, task: &Task<T>) -> bool {
        let scheduled = self
            .sequence(task, Access::Write)
            .and_then(|()| self.scheduler.submit(task).map_err(SyncError::from));
        match scheduled {
            Ok(()) => true,
            Err(err) => {
                error!(task = %task.name(), error = %err, "failed to schedule remote write");
                false
            }
        }
    }

    fn check<T>(self: &Arc<Self>, expected: T, fetch: Task<T>)
    where
        T: PartialEq + Debug + Clone + Send + Sync + 'static,
    {
        if let Err(err) = self.try_check(expected, fetch) {
            error!(error = %err, "failed to schedule consistency check");
        }
    }

    fn try_check<T>(self: &Arc<Self>, expected: T, fetch: Task<T>) -> SyncResult<()>
    where
        T: PartialEq + Debug + Clone + Send + Sync + 'static,
    {
        if !fetch.is_submitted() {
            self.sequence(&fetch, Access::Read)?;
        }
        self.stats.lock().checks_started += 1;

        let on_diverged = {
            let shared = Arc::clone(self);
            move |_: &T, _: &T| shared.raise_alert()
        };
        let decision = read_repair(&self.scheduler, expected, fetch, on_diverged)?;

        let record = {
            let shared = Arc::clone(self);
            let source = decision.clone();
            Task::from_fn("check/record", move || {
                let verdict = source.result().copied().unwrap_or(Verdict::Indeterminate);
                shared.record_verdict(verdict);
            })
        };
        record.add_dependency(&decision)?;
        self.scheduler.submit(&record)?;
        Ok(())
    }

    fn record_verdict(&self, verdict: Verdict) {
        let mut stats = self.stats.lock();
        match verdict {
            Verdict::Consistent => stats.checks_consistent += 1,
            Verdict::Diverged => stats.checks_diverged += 1,
            Verdict::Indeterminate => stats.checks_indeterminate += 1,
        }
    }

    fn raise_alert(self: &Arc<Self>) {
        let alert_config = &self.config.alert;
        let ignore = AlertOption::new(alert_config.ignore_label.clone(), || {
            warn!("user canceled sync");
        });
        let sync = {
            let shared = Arc::clone(self);
            AlertOption::new(alert_config.sync_label.clone(), move || {
                if let Err(err) = shared.start_sync() {
                    error!(error = %err, "failed to start requested sync");
                }
            })
        };
        let alert = InconsistencyAlert::new(alert_config.message.clone(), vec![ignore, sync]);

        let notifier = Arc::clone(&self.notifier);
        let task = Task::from_fn("alert", move || notifier.on_inconsistency_detected(alert));
        if let Err(err) = self.scheduler.submit(&task) {
            error!(error = %err, "failed to schedule inconsistency alert");
        }
    }

    fn start_sync(self: &Arc<Self>) -> SyncResult<SyncPipeline> {
        self.stats.lock().syncs_started += 1;

        let fetch = self.remote_task("sync/fetch", |shared| async move {
            match shared.remote.fetch_all().await {
                Ok(snapshot) => {
                    shared.revision.observe(snapshot.revision);
                    Some(snapshot)
                }
                Err(err) => {
                    shared.read_failed("sync", &err);
                    None
                }
            }
        });

        let mode = self.config.reconcile_mode;
        let apply = {
            let shared = Arc::clone(self);
            move |snapshot: Snapshot| {
                let _guard = shared.local_writes.lock();
                reconcile(&shared.local, snapshot.items, mode)
            }
        };
        let finish = {
            let shared = Arc::clone(self);
            move |outcome: &SyncOutcome| {
                {
                    let mut stats = shared.stats.lock();
                    stats.syncs_finished += 1;
                    if let Some(report) = &outcome.report {
                        stats.items_reconciled += report.applied() as u64;
                        stats.last_sync_time = Some(Instant::now());
                    }
                }
                info!(applied = outcome.applied(), "sync finished");
                shared.notifier.on_sync_finished(outcome);
            }
        };

        let pipeline = SyncPipeline::new(fetch, apply, finish)?;
        self.sequence(&pipeline.fetch, Access::Read)?;
        pipeline.submit(&self.scheduler)?;
        Ok(pipeline)
    }

    fn outcome(
        &self,
        op: &str,
        result: RemoteResult<Versioned<Item>>,
    ) -> Option<bool> {
        match result {
            Ok(versioned) => {
                self.remote_succeeded(versioned.revision);
                Some(true)
            }
            Err(RemoteError::NotFound) => {
                self.write_failed(op, &RemoteError::NotFound);
                Some(false)
            }
            Err(err) => {
                self.write_failed(op, &err);
                None
            }
        }
    }

    fn remote_succeeded(&self, revision: Revision) {
        let current = self.revision.observe(revision);
        self.stats.lock().remote_writes_ok += 1;
        debug!(revision = current.as_u64(), "remote write applied");
    }

    fn read_failed(&self, op: &str, err: &RemoteError) {
        warn!(op, error = %err, "remote read failed");
        self.stats.lock().last_error = Some(err.to_string());
    }

    fn write_failed(&self, op: &str, err: &RemoteError) {
        warn!(op, error = %err, "remote write failed, local state kept");
        let mut stats = self.stats.lock();
        stats.remote_writes_failed += 1;
        stats.last_error = Some(err.to_string());
    }
}
