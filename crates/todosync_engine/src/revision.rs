//! Last-known revision tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use todosync_core::Revision;

/// The facade's last-known remote revision.
///
/// Only ever moves forward: responses arriving out of order cannot roll it
/// back.
#[derive(Debug, Default)]
pub struct RevisionTracker {
    current: AtomicU64,
}

impl RevisionTracker {
    /// Creates a tracker starting at `initial`.
    pub fn new(initial: Revision) -> Self {
        Self {
            current: AtomicU64::new(initial.as_u64()),
        }
    }

    /// Returns the last-known revision.
    pub fn current(&self) -> Revision {
        Revision::new(self.current.load(Ordering::SeqCst))
    }

    /// Records a revision seen in a response and returns the new current
    /// value.
    pub fn observe(&self, revision: Revision) -> Revision {
        let previous = self.current.fetch_max(revision.as_u64(), Ordering::SeqCst);
        Revision::new(previous.max(revision.as_u64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn never_decreases() {
        let tracker = RevisionTracker::new(Revision::new(5));
        assert_eq!(tracker.observe(Revision::new(3)), Revision::new(5));
        assert_eq!(tracker.observe(Revision::new(8)), Revision::new(8));
        assert_eq!(tracker.observe(Revision::new(7)), Revision::new(8));
        assert_eq!(tracker.current(), Revision::new(8));
    }

    #[test]
    fn concurrent_observers_keep_maximum() {
        let tracker = Arc::new(RevisionTracker::default());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        tracker.observe(Revision::new(t * 100 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.current(), Revision::new(799));
    }
}
