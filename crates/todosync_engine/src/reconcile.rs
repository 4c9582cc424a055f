//! Bulk reconciliation of a remote snapshot into the local cache.

use todosync_core::{Item, LocalStore, Revision, Snapshot, Upsert};
use todosync_tasks::{Scheduler, Task, TaskResult};
use tracing::{debug, info};

/// How a snapshot is applied to the local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Upsert every remote item; local items missing remotely survive.
    #[default]
    Additive,
    /// Flush the cache first, leaving exactly the remote items.
    Replace,
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Items that were not cached before.
    pub inserted: usize,
    /// Cached items replaced by their remote version.
    pub updated: usize,
    /// Whether the cache was flushed first.
    pub flushed: bool,
}

impl ReconcileReport {
    /// Number of items written to the cache.
    pub fn applied(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Applies remote items to the local cache.
///
/// Each item replaces the cached item with the same id or is appended.
/// Fields are never merged. In [`ReconcileMode::Additive`] cached items
/// absent from `items` are left untouched, so running twice with the same
/// input leaves the cache as running once.
pub fn reconcile<L>(local: &L, items: Vec<Item>, mode: ReconcileMode) -> ReconcileReport
where
    L: LocalStore + ?Sized,
{
    let mut report = ReconcileReport::default();
    if mode == ReconcileMode::Replace {
        local.flush();
        report.flushed = true;
    }

    for item in items {
        let id = item.id;
        match local.upsert(item) {
            Upsert::Inserted => {
                report.inserted += 1;
                info!(item_id = %id, "reconcile inserted item");
            }
            Upsert::Updated => {
                report.updated += 1;
                info!(item_id = %id, "reconcile updated item");
            }
        }
    }
    report
}

/// Result of a finished sync pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// What the update stage applied. `None` means nothing was applied,
    /// typically because the fetch failed.
    pub report: Option<ReconcileReport>,
    /// Revision of the applied snapshot.
    pub revision: Option<Revision>,
}

impl SyncOutcome {
    /// Returns true if a snapshot was applied.
    pub fn applied(&self) -> bool {
        self.report.is_some()
    }
}

/// Handles to the four stages of a sync.
///
/// `fetch → transfer → update → notify`, each stage depending on the one
/// before it.
#[derive(Debug, Clone)]
pub struct SyncPipeline {
    /// Obtains the remote snapshot.
    pub fetch: Task<Snapshot>,
    /// Copies the fetched snapshot into the update stage's input.
    pub transfer: Task<Snapshot>,
    /// Applies the snapshot to the cache.
    pub update: Task<ReconcileReport>,
    /// Reports completion.
    pub notify: Task<SyncOutcome>,
}

impl SyncPipeline {
    /// Wires the stages behind `fetch`.
    ///
    /// `apply` runs in the update stage only if the transfer produced a
    /// snapshot. `finish` always runs in the notify stage.
    pub fn new<A, F>(fetch: Task<Snapshot>, apply: A, finish: F) -> TaskResult<Self>
    where
        A: FnOnce(Snapshot) -> ReconcileReport + Send + 'static,
        F: FnOnce(&SyncOutcome) + Send + 'static,
    {
        let transfer = {
            let source = fetch.clone();
            Task::new("sync/transfer", move || {
                let snapshot = source.result().cloned();
                async move { snapshot }
            })
        };
        transfer.add_dependency(&fetch)?;

        let update = {
            let source = transfer.clone();
            Task::new("sync/update", move || {
                let report = match source.result() {
                    Some(snapshot) => Some(apply(snapshot.clone())),
                    None => {
                        debug!("no snapshot transferred, update is a no-op");
                        None
                    }
                };
                async move { report }
            })
        };
        update.add_dependency(&transfer)?;

        let notify = {
            let report_source = update.clone();
            let snapshot_source = transfer.clone();
            Task::from_fn("sync/notify", move || {
                let report = report_source.result().cloned();
                let revision = report
                    .as_ref()
                    .and(snapshot_source.result())
                    .map(|snapshot| snapshot.revision);
                let outcome = SyncOutcome { report, revision };
                finish(&outcome);
                outcome
            })
        };
        notify.add_dependency(&update)?;

        Ok(Self {
            fetch,
            transfer,
            update,
            notify,
        })
    }

    /// Submits every stage.
    pub fn submit(&self, scheduler: &Scheduler) -> TaskResult<()> {
        scheduler.submit(&self.fetch)?;
        scheduler.submit(&self.transfer)?;
        scheduler.submit(&self.update)?;
        scheduler.submit(&self.notify)?;
        Ok(())
    }

    /// Waits for the notify stage and returns the outcome.
    pub async fn finished(&self) -> SyncOutcome {
        self.notify.finished().await;
        self.notify.result().cloned().unwrap_or_default()
    }
}
