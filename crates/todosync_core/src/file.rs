//! JSON file backed local cache.

use crate::error::CoreResult;
use crate::item::Item;
use crate::memory::MemoryCache;
use crate::store::{LocalStore, Upsert};
use crate::types::{ItemId, Revision};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk layout of a cache file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    items: Vec<Item>,
    #[serde(default)]
    revision: Revision,
}

/// A local cache persisted as a single JSON document.
///
/// Reads and writes go to memory; [`FileCache::save`] writes the whole
/// cache out and [`FileCache::load`] reads it back. The last-known remote
/// revision is stored alongside the items so a later session can resume
/// with the right optimistic-concurrency precondition.
///
/// # File format
///
/// ```json
/// { "items": [ { "id": "...", "text": "...", ... } ], "revision": 42 }
/// ```
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    items: MemoryCache,
    revision: Mutex<Revision>,
}

impl FileCache {
    /// Opens a cache at `path`, loading it if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let cache = Self {
            path: path.into(),
            items: MemoryCache::new(),
            revision: Mutex::new(Revision::ZERO),
        };
        if cache.path.exists() {
            cache.load()?;
        } else {
            debug!(path = %cache.path.display(), "cache file missing, starting empty");
        }
        Ok(cache)
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored last-known remote revision.
    pub fn revision(&self) -> Revision {
        *self.revision.lock()
    }

    /// Stores the last-known remote revision.
    pub fn set_revision(&self, revision: Revision) {
        *self.revision.lock() = revision;
    }

    /// Replaces the in-memory state with the file contents.
    pub fn load(&self) -> CoreResult<()> {
        let bytes = fs::read(&self.path)?;
        let file: CacheFile = serde_json::from_slice(&bytes)?;
        info!(
            path = %self.path.display(),
            items = file.items.len(),
            revision = file.revision.as_u64(),
            "cache loaded"
        );
        self.items.replace_all(file.items);
        self.set_revision(file.revision);
        Ok(())
    }

    /// Writes the cache to disk.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// target, so a crash never leaves a half-written cache behind.
    pub fn save(&self) -> CoreResult<()> {
        let file = CacheFile {
            items: self.items.list(),
            revision: self.revision(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), items = file.items.len(), "cache saved");
        Ok(())
    }
}

impl LocalStore for FileCache {
    fn list(&self) -> Vec<Item> {
        self.items.list()
    }

    fn add(&self, item: Item) {
        self.items.add(item);
    }

    fn update(&self, id: ItemId, item: Item) -> bool {
        self.items.update(id, item)
    }

    fn remove(&self, id: ItemId) -> bool {
        self.items.remove(id)
    }

    fn get(&self, id: ItemId) -> Option<Item> {
        self.items.get(id)
    }

    fn flush(&self) {
        self.items.flush();
    }

    fn upsert(&self, item: Item) -> Upsert {
        self.items.upsert(item)
    }
}
