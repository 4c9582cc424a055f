//! Configuration for the synced storage facade.

use crate::reconcile::ReconcileMode;
use std::time::Duration;
use todosync_core::Revision;
use todosync_tasks::SchedulerConfig;

/// Configuration for a [`SyncedStorage`](crate::SyncedStorage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum number of tasks running at once.
    pub max_concurrency: usize,
    /// Upper bound on any single remote leg. `None` waits forever.
    pub task_timeout: Option<Duration>,
    /// How `sync()` applies a remote snapshot.
    pub reconcile_mode: ReconcileMode,
    /// Last-known revision to start from (e.g. restored from disk).
    pub initial_revision: Revision,
    /// Text of the inconsistency alert.
    pub alert: AlertConfig,
}

impl SyncConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            max_concurrency: 2,
            task_timeout: Some(Duration::from_secs(30)),
            reconcile_mode: ReconcileMode::Additive,
            initial_revision: Revision::ZERO,
            alert: AlertConfig::default(),
        }
    }

    /// Sets the concurrency limit.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Sets the per-task timeout.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Lets remote legs run unbounded.
    pub fn without_timeout(mut self) -> Self {
        self.task_timeout = None;
        self
    }

    /// Sets the reconcile mode.
    pub fn with_reconcile_mode(mut self, mode: ReconcileMode) -> Self {
        self.reconcile_mode = mode;
        self
    }

    /// Sets the starting revision.
    pub fn with_initial_revision(mut self, revision: Revision) -> Self {
        self.initial_revision = revision;
        self
    }

    /// Sets the alert text.
    pub fn with_alert(mut self, alert: AlertConfig) -> Self {
        self.alert = alert;
        self
    }

    /// Returns the scheduler configuration derived from this config.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let config = SchedulerConfig::default().with_max_concurrency(self.max_concurrency);
        match self.task_timeout {
            Some(timeout) => config.with_task_timeout(timeout),
            None => config.without_timeout(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Text shown when a consistency check fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertConfig {
    /// Alert message.
    pub message: String,
    /// Label of the option that leaves local state alone.
    pub ignore_label: String,
    /// Label of the option that forces a re-sync.
    pub sync_label: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            message: "Server sync needed".into(),
            ignore_label: "Cancel".into(),
            sync_label: "Sync".into(),
        }
    }
}
