//! Property tests for reconciliation.

use proptest::prelude::*;
use std::collections::HashSet;
use todosync_core::{LocalStore, MemoryCache};
use todosync_engine::{reconcile, ReconcileMode};
use todosync_testkit::{items_strategy, overlapping_items_strategy};

proptest! {
    #[test]
    fn reconcile_is_idempotent(
        (cached, remote) in overlapping_items_strategy(10),
    ) {
        let once = MemoryCache::with_items(cached.clone());
        reconcile(&once, remote.clone(), ReconcileMode::Additive);

        let twice = MemoryCache::with_items(cached);
        reconcile(&twice, remote.clone(), ReconcileMode::Additive);
        reconcile(&twice, remote, ReconcileMode::Additive);

        prop_assert_eq!(once.list(), twice.list());
    }

    #[test]
    fn additive_never_drops_items(
        (cached, remote) in overlapping_items_strategy(10),
    ) {
        let cache = MemoryCache::with_items(cached.clone());
        let report = reconcile(&cache, remote.clone(), ReconcileMode::Additive);

        let after: HashSet<_> = cache.list().iter().map(|i| i.id).collect();
        for item in &cached {
            prop_assert!(after.contains(&item.id));
        }
        for item in &remote {
            let got = cache.get(item.id);
            prop_assert_eq!(got.as_ref(), Some(item));
        }
        prop_assert_eq!(report.applied(), remote.len());
    }

    #[test]
    fn replace_leaves_exactly_remote(
        cached in items_strategy(10),
        remote in items_strategy(10),
    ) {
        let cache = MemoryCache::with_items(cached);
        let report = reconcile(&cache, remote.clone(), ReconcileMode::Replace);

        prop_assert!(report.flushed);
        prop_assert_eq!(report.inserted, remote.len());
        prop_assert_eq!(cache.list(), remote);
    }

    #[test]
    fn additive_updates_shared_items_in_place(
        (cached, remote) in overlapping_items_strategy(10),
    ) {
        let cached_ids: HashSet<_> = cached.iter().map(|i| i.id).collect();
        let shared = remote.iter().filter(|i| cached_ids.contains(&i.id)).count();

        let cache = MemoryCache::with_items(cached.clone());
        let report = reconcile(&cache, remote.clone(), ReconcileMode::Additive);

        prop_assert!(!report.flushed);
        prop_assert_eq!(report.updated, shared);
        prop_assert_eq!(report.inserted, remote.len() - shared);
        prop_assert_eq!(cache.list().len(), cached.len() + report.inserted);

        // Shared items keep their cached position.
        let after = cache.list();
        for (position, item) in cached.iter().enumerate() {
            prop_assert_eq!(after[position].id, item.id);
        }

        let before = cache.list();
        let again = reconcile(&cache, remote.clone(), ReconcileMode::Additive);
        prop_assert_eq!(again.updated, remote.len());
        prop_assert_eq!(again.inserted, 0);
        prop_assert_eq!(cache.list(), before);
    }
}
