//! Test fixtures and storage helpers.
//!
//! Provides convenience functions for setting up caches, items and facades
//! for common test scenarios.

use crate::notifier::RecordingNotifier;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use todosync_core::{FileCache, Item, ItemId, MemoryCache, Timestamp};
use todosync_engine::{RemoteStore, SyncConfig, SyncedStorage};
use uuid::Uuid;

/// Returns an item id built from a small number, for readable tests.
pub fn fixed_id(n: u128) -> ItemId {
    ItemId::from_uuid(Uuid::from_u128(n))
}

/// Creates an item with a fixed id and fixed timestamps.
///
/// Two calls with the same arguments produce equal items.
pub fn item(n: u128, text: &str) -> Item {
    Item::new(text)
        .with_id(fixed_id(n))
        .with_timestamps(Timestamp(1_700_000_000), Timestamp(1_700_000_000))
}

/// Config used by test facades: production defaults with a short timeout.
pub fn test_config() -> SyncConfig {
    SyncConfig::default().with_task_timeout(Duration::from_secs(5))
}

/// Creates a facade over an empty memory cache.
///
/// Must be called inside a tokio runtime.
pub fn memory_storage<R: RemoteStore>(
    remote: R,
    notifier: &Arc<RecordingNotifier>,
) -> SyncedStorage<MemoryCache, R> {
    memory_storage_with(MemoryCache::new(), remote, notifier, test_config())
}

/// Creates a facade over the given cache and config.
pub fn memory_storage_with<R: RemoteStore>(
    cache: MemoryCache,
    remote: R,
    notifier: &Arc<RecordingNotifier>,
    config: SyncConfig,
) -> SyncedStorage<MemoryCache, R> {
    SyncedStorage::new(cache, remote, Arc::clone(notifier), config)
        .expect("tests run inside a tokio runtime")
}

/// A file cache in a temporary directory with automatic cleanup.
pub struct TempCache {
    /// The temporary directory (kept alive to prevent cleanup).
    pub dir: TempDir,
    /// The cache.
    pub cache: FileCache,
}

impl TempCache {
    /// Opens a fresh, empty cache.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let cache = FileCache::open(dir.path().join("cache.json")).expect("Failed to open cache");
        Self { dir, cache }
    }

    /// Opens a second cache on the same file.
    pub fn reopen(&self) -> FileCache {
        FileCache::open(self.cache.path()).expect("Failed to reopen cache")
    }
}

impl Default for TempCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TempCache {
    type Target = FileCache;

    fn deref(&self) -> &Self::Target {
        &self.cache
    }
}
