//! End-to-end behavior of the synced storage facade.

use std::sync::Arc;
use std::time::{Duration, Instant};
use todosync_core::{Item, LocalStore, MemoryCache, Revision, Snapshot};
use todosync_engine::{
    HttpRemote, LoopbackClient, MemoryRemote, ReconcileMode, RemoteError, SyncConfig,
};
use todosync_testkit::prelude::*;

const WAIT: Duration = Duration::from_secs(5);

async fn within<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(WAIT, fut)
        .await
        .expect("operation did not finish in time")
}

fn remote_with(items: Vec<Item>, revision: u64) -> MemoryRemote {
    MemoryRemote::from_snapshot(Snapshot::new(items, Revision::new(revision)))
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatch_raises_alert() {
    let notifier = RecordingNotifier::new();
    let cache = MemoryCache::with_items(vec![item(1, "buy milk")]);
    let remote = remote_with(vec![item(1, "buy oat milk")], 1);
    let storage = memory_storage_with(cache, remote, &notifier, test_config());

    assert_eq!(storage.get(fixed_id(1)), Some(item(1, "buy milk")));

    let alerts = within(notifier.wait_for_alerts(1)).await;
    assert_eq!(alerts[0].message, "Server sync needed");
    assert_eq!(alerts[0].labels, vec!["Cancel", "Sync"]);

    within(storage.scheduler().wait_idle()).await;
    let stats = storage.stats();
    assert_eq!(stats.checks_started, 1);
    assert_eq!(stats.checks_diverged, 1);
    // Ignoring the alert leaves the cache alone.
    assert_eq!(storage.local().get(fixed_id(1)), Some(item(1, "buy milk")));
}

#[tokio::test(flavor = "multi_thread")]
async fn choosing_sync_reconciles() {
    let notifier = RecordingNotifier::answering("Sync");
    let cache = MemoryCache::with_items(vec![item(1, "buy milk")]);
    let remote = remote_with(vec![item(1, "buy oat milk"), item(2, "call mom")], 3);
    let storage = memory_storage_with(cache, remote, &notifier, test_config());

    storage.list();

    let outcomes = within(notifier.wait_for_outcomes(1)).await;
    let report = outcomes[0].report.clone().expect("snapshot applied");
    assert_eq!(report.updated, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(outcomes[0].revision, Some(Revision::new(3)));

    assert_eq!(storage.local().get(fixed_id(1)), Some(item(1, "buy oat milk")));
    assert_eq!(storage.local().len(), 2);
    assert_eq!(storage.last_known_revision(), Revision::new(3));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_into_empty_cache() {
    let notifier = RecordingNotifier::new();
    let remote = remote_with(vec![item(2, "B"), item(3, "C")], 2);
    let storage = memory_storage(remote, &notifier);

    let pipeline = storage.sync().unwrap();
    let outcome = within(pipeline.finished()).await;

    assert!(outcome.applied());
    assert_eq!(storage.local().list(), vec![item(2, "B"), item(3, "C")]);
    assert_eq!(within(notifier.wait_for_outcomes(1)).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn local_only_items_survive_sync() {
    let notifier = RecordingNotifier::new();
    let cache = MemoryCache::with_items(vec![item(9, "offline note")]);
    let storage = memory_storage_with(
        cache,
        remote_with(vec![item(2, "B")], 1),
        &notifier,
        test_config(),
    );

    within(storage.sync().unwrap().finished()).await;

    assert_eq!(storage.local().get(fixed_id(9)), Some(item(9, "offline note")));
    assert_eq!(storage.local().get(fixed_id(2)), Some(item(2, "B")));
    assert_eq!(storage.local().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn replace_mode_drops_local_only_items() {
    let notifier = RecordingNotifier::new();
    let cache = MemoryCache::with_items(vec![item(9, "offline note")]);
    let config = test_config().with_reconcile_mode(ReconcileMode::Replace);
    let storage = memory_storage_with(cache, remote_with(vec![item(2, "B")], 1), &notifier, config);

    let outcome = within(storage.sync().unwrap().finished()).await;

    assert!(outcome.report.map(|r| r.flushed).unwrap_or(false));
    assert_eq!(storage.local().list(), vec![item(2, "B")]);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_fetch_still_notifies() {
    let notifier = RecordingNotifier::new();
    let cache = MemoryCache::with_items(vec![item(1, "kept")]);
    let storage =
        memory_storage_with(cache, FailingRemote::offline(), &notifier, test_config());

    let outcome = within(storage.sync().unwrap().finished()).await;

    assert!(outcome.report.is_none());
    let outcomes = within(notifier.wait_for_outcomes(1)).await;
    assert!(!outcomes[0].applied());
    assert_eq!(storage.local().list(), vec![item(1, "kept")]);

    let stats = storage.stats();
    assert_eq!(stats.syncs_started, 1);
    assert_eq!(stats.syncs_finished, 1);
    assert_eq!(stats.items_reconciled, 0);
    assert!(stats.last_error.is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn add_returns_while_remote_hangs() {
    let notifier = RecordingNotifier::new();
    let storage = memory_storage(PendingRemote::new(), &notifier);
    let d = item(4, "D");

    let started = Instant::now();
    storage.add(d.clone());
    let got = storage.get(d.id);
    assert!(started.elapsed() < Duration::from_millis(500));

    assert_eq!(got, Some(d));
    assert!(storage.scheduler().outstanding() > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_does_not_wait_for_remote() {
    let notifier = RecordingNotifier::new();
    let a = item(1, "buy milk");
    let remote = DelayedRemote::new(remote_with(vec![a.clone()], 1), Duration::from_millis(800));
    let cache = MemoryCache::with_items(vec![a.clone()]);
    let storage = memory_storage_with(cache, remote, &notifier, test_config());

    let started = Instant::now();
    assert_eq!(storage.get(a.id), Some(a));
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(storage.stats().checks_consistent, 0);

    within(storage.scheduler().wait_idle()).await;
    assert_eq!(storage.stats().checks_consistent, 1);
    assert!(notifier.alerts().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn revision_follows_remote_writes() {
    let notifier = RecordingNotifier::new();
    let storage = memory_storage(MemoryRemote::new(), &notifier);

    for n in 1..=5 {
        storage.add(item(n, "task"));
    }
    within(storage.scheduler().wait_idle()).await;

    assert_eq!(storage.last_known_revision(), Revision::new(5));
    assert_eq!(storage.remote().revision(), Revision::new(5));
    assert_eq!(storage.remote().snapshot().len(), 5);
    assert_eq!(storage.stats().remote_writes_ok, 5);

    // Writes reach the backend in call order.
    let ids: Vec<_> = storage.remote().snapshot().items.iter().map(|i| i.id).collect();
    assert_eq!(ids, (1..=5).map(fixed_id).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_revision_is_swallowed() {
    let notifier = RecordingNotifier::new();
    let remote = MemoryRemote::new();
    remote.apply_external(item(1, "from another device"));
    let storage = memory_storage(remote, &notifier);

    storage.add(item(2, "mine"));
    within(storage.scheduler().wait_idle()).await;

    assert_eq!(storage.local().get(fixed_id(2)), Some(item(2, "mine")));
    assert_eq!(storage.remote().snapshot().len(), 1);
    let stats = storage.stats();
    assert_eq!(stats.remote_writes_failed, 1);
    assert!(stats
        .last_error
        .unwrap_or_default()
        .contains("unsynchronized revision"));
    assert_eq!(storage.last_known_revision(), Revision::ZERO);

    // A sync picks up the backend revision; later writes go through.
    within(storage.sync().unwrap().finished()).await;
    assert_eq!(storage.last_known_revision(), Revision::new(1));
    storage.add(item(3, "after sync"));
    within(storage.scheduler().wait_idle()).await;
    assert_eq!(storage.last_known_revision(), Revision::new(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn update_and_remove_check_remote_outcome() {
    let notifier = RecordingNotifier::new();
    let storage = memory_storage(MemoryRemote::new(), &notifier);
    let a = item(1, "buy milk");

    storage.add(a.clone());
    assert!(storage.update(a.id, a.edited("buy oat milk")));
    assert!(storage.remove(a.id));
    // Absent in both stores: both sides report false.
    assert!(!storage.remove(a.id));
    within(storage.scheduler().wait_idle()).await;

    let stats = storage.stats();
    assert_eq!(stats.checks_started, 3);
    assert_eq!(stats.checks_consistent, 3);
    assert_eq!(stats.checks_diverged, 0);
    assert!(notifier.alerts().is_empty());
    assert!(storage.remote().snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn update_missing_remotely_diverges() {
    let notifier = RecordingNotifier::new();
    let a = item(1, "local only");
    let cache = MemoryCache::with_items(vec![a.clone()]);
    let storage = memory_storage_with(cache, MemoryRemote::new(), &notifier, test_config());

    assert!(storage.update(a.id, a.edited("edited")));
    within(notifier.wait_for_alerts(1)).await;
    within(storage.scheduler().wait_idle()).await;
    assert_eq!(storage.stats().checks_diverged, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn list_compares_in_id_order() {
    let notifier = RecordingNotifier::new();
    let cache = MemoryCache::with_items(vec![item(3, "c"), item(1, "a"), item(2, "b")]);
    let remote = remote_with(vec![item(1, "a"), item(2, "b"), item(3, "c")], 3);
    let storage = memory_storage_with(cache, remote, &notifier, test_config());

    let listed = storage.list();
    assert_eq!(listed[0], item(3, "c"));

    within(storage.scheduler().wait_idle()).await;
    assert_eq!(storage.stats().checks_consistent, 1);
    assert!(notifier.alerts().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_outage_is_indeterminate() {
    let notifier = RecordingNotifier::new();
    let storage = memory_storage(
        FailingRemote::new(RemoteError::Unauthorized),
        &notifier,
    );

    assert_eq!(storage.get(fixed_id(1)), None);
    storage.list();
    within(storage.scheduler().wait_idle()).await;

    let stats = storage.stats();
    assert_eq!(stats.checks_indeterminate, 2);
    assert!(notifier.alerts().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn full_wire_path() {
    let backend = Arc::new(MemoryRemote::new().with_token("secret"));
    let remote = HttpRemote::new("http://backend/todo", LoopbackClient::new(Arc::clone(&backend)))
        .with_token("secret");
    let notifier = RecordingNotifier::new();
    let storage = memory_storage(remote, &notifier);

    let a = item(1, "buy milk");
    storage.add(a.clone());
    storage.update(a.id, a.edited("buy oat milk"));
    storage.add(item(2, "call mom"));
    within(storage.scheduler().wait_idle()).await;

    assert_eq!(backend.revision(), Revision::new(3));
    assert_eq!(storage.last_known_revision(), Revision::new(3));
    assert_eq!(backend.snapshot().sorted_by_id(), {
        let mut local = storage.local().list();
        local.sort_by_key(|i| i.id);
        local
    });

    storage.list();
    within(storage.scheduler().wait_idle()).await;
    assert_eq!(storage.stats().checks_diverged, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn without_token_writes_are_swallowed() {
    let backend = Arc::new(MemoryRemote::new());
    let remote = HttpRemote::new("http://backend", LoopbackClient::new(Arc::clone(&backend)));
    let notifier = RecordingNotifier::new();
    let storage = memory_storage(remote, &notifier);

    storage.add(item(1, "offline"));
    within(storage.scheduler().wait_idle()).await;

    assert_eq!(backend.request_count(), 0);
    assert_eq!(storage.local().len(), 1);
    assert!(storage
        .stats()
        .last_error
        .unwrap_or_default()
        .contains("missing credential"));
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_scheduler_across_facades() {
    let scheduler = todosync_tasks::Scheduler::new(
        todosync_tasks::SchedulerConfig::default().with_max_concurrency(1),
    )
    .unwrap();
    let notifier = RecordingNotifier::new();
    let first = SyncedStorage::with_scheduler(
        MemoryCache::new(),
        MemoryRemote::new(),
        Arc::clone(&notifier),
        SyncConfig::default(),
        scheduler.clone(),
    );
    let second = SyncedStorage::with_scheduler(
        MemoryCache::new(),
        MemoryRemote::new(),
        Arc::clone(&notifier),
        SyncConfig::default(),
        scheduler.clone(),
    );

    first.add(item(1, "a"));
    second.add(item(2, "b"));
    within(scheduler.wait_idle()).await;

    assert_eq!(first.remote().snapshot().items, vec![item(1, "a")]);
    assert_eq!(second.remote().snapshot().items, vec![item(2, "b")]);
    assert_eq!(scheduler.stats().submitted, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reads_then_writes_never_raise_false_alerts() {
    let notifier = RecordingNotifier::new();
    let a = item(1, "buy milk");
    let cache = MemoryCache::with_items(vec![a.clone()]);
    let remote = remote_with(vec![a.clone()], 0);
    let storage = memory_storage_with(cache, remote, &notifier, test_config());

    const ROUNDS: u64 = 200;
    for round in 0..ROUNDS {
        let current = storage.local().get(a.id).expect("item cached");
        storage.list();
        storage.get(a.id);
        assert!(storage.update(a.id, current.edited(format!("round {round}"))));
        within(storage.scheduler().wait_idle()).await;
    }

    let stats = storage.stats();
    assert_eq!(stats.checks_diverged, 0);
    assert_eq!(stats.checks_indeterminate, 0);
    assert_eq!(stats.checks_consistent, 3 * ROUNDS);
    assert!(notifier.alerts().is_empty());
    assert_eq!(storage.remote().snapshot().items, storage.local().list());
    assert_eq!(storage.last_known_revision(), Revision::new(ROUNDS));
}

#[tokio::test(flavor = "multi_thread")]
async fn write_waits_for_earlier_read() {
    let notifier = RecordingNotifier::new();
    let a = item(1, "buy milk");
    let remote = DelayedRemote::new(remote_with(vec![a.clone()], 0), Duration::from_millis(100));
    let cache = MemoryCache::with_items(vec![a.clone()]);
    let storage = memory_storage_with(cache, remote, &notifier, test_config());

    storage.get(a.id);
    storage.remove(a.id);
    within(storage.scheduler().wait_idle()).await;

    // The read saw the item before the delete reached the backend.
    let stats = storage.stats();
    assert_eq!(stats.checks_consistent, 2);
    assert_eq!(stats.checks_diverged, 0);
    assert!(storage.remote().inner().snapshot().is_empty());
}
