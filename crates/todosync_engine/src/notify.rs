//! Notification port.
//!
//! The facade reports two things to its host: a finished sync, and a
//! failed consistency check together with the choices the user has. The
//! notifier decides how (and on which thread) to surface them.

use crate::reconcile::SyncOutcome;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Receives sync events from a [`SyncedStorage`](crate::SyncedStorage).
pub trait SyncNotifier: Send + Sync + 'static {
    /// Called when a `sync()` pipeline reaches its last stage.
    ///
    /// Completion is not success: `outcome.report` is `None` when the fetch
    /// failed and nothing was applied.
    fn on_sync_finished(&self, outcome: &SyncOutcome);

    /// Called when a read-repair check found local and remote state
    /// diverged.
    fn on_inconsistency_detected(&self, alert: InconsistencyAlert);
}

impl<N: SyncNotifier + ?Sized> SyncNotifier for Arc<N> {
    fn on_sync_finished(&self, outcome: &SyncOutcome) {
        (**self).on_sync_finished(outcome);
    }

    fn on_inconsistency_detected(&self, alert: InconsistencyAlert) {
        (**self).on_inconsistency_detected(alert);
    }
}

/// One choice offered by an [`InconsistencyAlert`].
pub struct AlertOption {
    /// Button label.
    pub label: String,
    action: Box<dyn FnOnce() + Send>,
}

impl AlertOption {
    /// Creates an option that runs `action` when chosen.
    pub fn new(label: impl Into<String>, action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            action: Box::new(action),
        }
    }

    /// Runs the option's action.
    pub fn run(self) {
        (self.action)();
    }
}

impl fmt::Debug for AlertOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertOption")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A divergence report with actionable options.
#[derive(Debug)]
pub struct InconsistencyAlert {
    /// Message to show.
    pub message: String,
    /// Choices, in display order.
    pub options: Vec<AlertOption>,
}

impl InconsistencyAlert {
    /// Creates an alert.
    pub fn new(message: impl Into<String>, options: Vec<AlertOption>) -> Self {
        Self {
            message: message.into(),
            options,
        }
    }

    /// Returns the option labels in display order.
    pub fn labels(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.label.as_str()).collect()
    }

    /// Runs the option with the given label.
    ///
    /// Returns false if no option has that label. Dropping an alert without
    /// choosing runs nothing.
    pub fn choose(self, label: &str) -> bool {
        match self.options.into_iter().find(|o| o.label == label) {
            Some(option) => {
                option.run();
                true
            }
            None => false,
        }
    }
}

/// An event forwarded by [`ChannelNotifier`].
#[derive(Debug)]
pub enum SyncEvent {
    /// A sync pipeline finished.
    SyncFinished(SyncOutcome),
    /// A consistency check failed.
    InconsistencyDetected(InconsistencyAlert),
}

/// Forwards events into an unbounded channel.
///
/// Lets the host handle events on its own task or thread, e.g. a UI loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: SyncEvent) {
        if self.tx.send(event).is_err() {
            warn!("sync event dropped, receiver closed");
        }
    }
}

impl SyncNotifier for ChannelNotifier {
    fn on_sync_finished(&self, outcome: &SyncOutcome) {
        self.forward(SyncEvent::SyncFinished(outcome.clone()));
    }

    fn on_inconsistency_detected(&self, alert: InconsistencyAlert) {
        self.forward(SyncEvent::InconsistencyDetected(alert));
    }
}

/// Logs events and takes no action.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl SyncNotifier for LogNotifier {
    fn on_sync_finished(&self, outcome: &SyncOutcome) {
        match &outcome.report {
            Some(report) => info!(
                inserted = report.inserted,
                updated = report.updated,
                "sync finished"
            ),
            None => warn!("sync finished without applying anything"),
        }
    }

    fn on_inconsistency_detected(&self, alert: InconsistencyAlert) {
        warn!(message = %alert.message, options = ?alert.labels(), "inconsistency detected");
    }
}
