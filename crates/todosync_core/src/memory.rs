//! In-memory local cache.

use crate::item::Item;
use crate::store::{LocalStore, Upsert};
use crate::types::ItemId;
use parking_lot::RwLock;
use tracing::trace;

/// An in-memory item cache.
///
/// Items are kept in insertion order. All access goes through a single
/// read-write lock, so mutation from the caller's thread and from
/// background tasks is serialized.
///
/// # Example
///
/// ```rust
/// use todosync_core::{Item, LocalStore, MemoryCache};
///
/// let cache = MemoryCache::new();
/// let item = Item::new("buy milk");
/// cache.add(item.clone());
/// assert_eq!(cache.get(item.id), Some(item));
/// ```
#[derive(Debug, Default)]
pub struct MemoryCache {
    items: RwLock<Vec<Item>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding the given items.
    ///
    /// Later duplicates of an id are dropped.
    #[must_use]
    pub fn with_items(items: Vec<Item>) -> Self {
        let cache = Self::new();
        for item in items {
            cache.add(item);
        }
        cache
    }

    /// Returns the number of cached items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Replaces the whole contents.
    pub(crate) fn replace_all(&self, items: Vec<Item>) {
        *self.items.write() = items;
    }
}

fn position(items: &[Item], id: ItemId) -> Option<usize> {
    items.iter().position(|item| item.id == id)
}

impl LocalStore for MemoryCache {
    fn list(&self) -> Vec<Item> {
        self.items.read().clone()
    }

    fn add(&self, item: Item) {
        let mut items = self.items.write();
        if position(&items, item.id).is_some() {
            trace!(item_id = %item.id, "item already cached, add ignored");
            return;
        }
        items.push(item);
    }

    fn update(&self, id: ItemId, item: Item) -> bool {
        let mut items = self.items.write();
        match position(&items, id) {
            Some(index) => {
                items[index] = item;
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: ItemId) -> bool {
        let mut items = self.items.write();
        match position(&items, id) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        }
    }

    fn get(&self, id: ItemId) -> Option<Item> {
        self.items.read().iter().find(|item| item.id == id).cloned()
    }

    fn flush(&self) {
        self.items.write().clear();
    }

    fn upsert(&self, item: Item) -> Upsert {
        let mut items = self.items.write();
        match position(&items, item.id) {
            Some(index) => {
                items[index] = item;
                Upsert::Updated
            }
            None => {
                items.push(item);
                Upsert::Inserted
            }
        }
    }
}
