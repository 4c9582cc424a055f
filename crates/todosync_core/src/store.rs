//! Local cache interface.

use crate::item::Item;
use crate::types::ItemId;

/// Outcome of an [`LocalStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// No item with that id existed; it was appended.
    Inserted,
    /// An item with that id was replaced in place.
    Updated,
}

/// A keyed, durable-or-not cache of items on this device.
///
/// Implementations must be internally synchronized: every method takes
/// `&self` and may be called from the caller's thread and from scheduler
/// tasks at the same time.
pub trait LocalStore: Send + Sync + 'static {
    /// Returns every cached item in cache order.
    fn list(&self) -> Vec<Item>;

    /// Appends an item. An id that is already cached is left untouched.
    fn add(&self, item: Item);

    /// Replaces the item with the given id in place.
    ///
    /// Returns false if no such item is cached.
    fn update(&self, id: ItemId, item: Item) -> bool;

    /// Removes the item with the given id.
    ///
    /// Returns false if no such item is cached.
    fn remove(&self, id: ItemId) -> bool;

    /// Returns the item with the given id.
    fn get(&self, id: ItemId) -> Option<Item>;

    /// Drops every cached item.
    fn flush(&self);

    /// Replaces the item with the same id, or appends it.
    ///
    /// The default runs `update` then `add`; implementations that can do
    /// both under one lock should override it.
    fn upsert(&self, item: Item) -> Upsert {
        if self.update(item.id, item.clone()) {
            Upsert::Updated
        } else {
            self.add(item);
            Upsert::Inserted
        }
    }
}
