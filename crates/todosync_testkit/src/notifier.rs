//! A notifier that records what it is told.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use todosync_engine::{InconsistencyAlert, SyncNotifier, SyncOutcome};

/// What an alert looked like when it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAlert {
    /// Alert message.
    pub message: String,
    /// Option labels in display order.
    pub labels: Vec<String>,
}

/// Records sync outcomes and alerts, optionally answering alerts.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    outcomes: Mutex<Vec<SyncOutcome>>,
    alerts: Mutex<Vec<RecordedAlert>>,
    answer: Mutex<Option<String>>,
    changed: Notify,
}

impl RecordingNotifier {
    /// Creates a notifier that answers nothing.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a notifier that chooses `label` on every alert.
    pub fn answering(label: &str) -> Arc<Self> {
        let notifier = Self::default();
        *notifier.answer.lock() = Some(label.to_string());
        Arc::new(notifier)
    }

    /// Returns the sync outcomes seen so far.
    pub fn outcomes(&self) -> Vec<SyncOutcome> {
        self.outcomes.lock().clone()
    }

    /// Returns the alerts seen so far.
    pub fn alerts(&self) -> Vec<RecordedAlert> {
        self.alerts.lock().clone()
    }

    /// Waits until at least `n` sync outcomes were recorded.
    pub async fn wait_for_outcomes(&self, n: usize) -> Vec<SyncOutcome> {
        loop {
            let notified = self.changed.notified();
            let outcomes = self.outcomes();
            if outcomes.len() >= n {
                return outcomes;
            }
            notified.await;
        }
    }

    /// Waits until at least `n` alerts were recorded.
    pub async fn wait_for_alerts(&self, n: usize) -> Vec<RecordedAlert> {
        loop {
            let notified = self.changed.notified();
            let alerts = self.alerts();
            if alerts.len() >= n {
                return alerts;
            }
            notified.await;
        }
    }
}

impl SyncNotifier for RecordingNotifier {
    fn on_sync_finished(&self, outcome: &SyncOutcome) {
        self.outcomes.lock().push(outcome.clone());
        self.changed.notify_waiters();
    }

    fn on_inconsistency_detected(&self, alert: InconsistencyAlert) {
        self.alerts.lock().push(RecordedAlert {
            message: alert.message.clone(),
            labels: alert.labels().into_iter().map(String::from).collect(),
        });
        let answer = self.answer.lock().clone();
        if let Some(label) = answer {
            alert.choose(&label);
        }
        self.changed.notify_waiters();
    }
}
