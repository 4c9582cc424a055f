//! The synchronized to-do record and remote snapshots.

use crate::types::{Color, ItemId, Priority, Revision, Timestamp};
use serde::{Deserialize, Serialize};

/// A to-do item.
///
/// Identity is [`Item::id`]; `PartialEq` compares every field, which is
/// what consistency checks rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Client-generated identifier.
    pub id: ItemId,
    /// Free-text body.
    pub text: String,
    /// Importance.
    #[serde(default)]
    pub priority: Priority,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Timestamp>,
    /// Optional display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    /// Whether the item is completed.
    #[serde(default)]
    pub done: bool,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub changed_at: Timestamp,
}

impl Item {
    /// Creates a new item with a fresh id and the current time.
    pub fn new(text: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: ItemId::new(),
            text: text.into(),
            priority: Priority::Normal,
            deadline: None,
            color: None,
            done: false,
            created_at: now,
            changed_at: now,
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the color.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the completion flag.
    #[must_use]
    pub fn with_done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    /// Sets both timestamps.
    #[must_use]
    pub fn with_timestamps(mut self, created_at: Timestamp, changed_at: Timestamp) -> Self {
        self.created_at = created_at;
        self.changed_at = changed_at;
        self
    }

    /// Returns a copy with new text and a bumped modification time.
    #[must_use]
    pub fn edited(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            changed_at: Timestamp::now().max(self.changed_at),
            ..self.clone()
        }
    }
}

/// The full remote collection at one revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Items in backend order.
    pub items: Vec<Item>,
    /// Revision the items were read at.
    pub revision: Revision,
}

impl Snapshot {
    /// Creates a snapshot.
    pub fn new(items: Vec<Item>, revision: Revision) -> Self {
        Self { items, revision }
    }

    /// Returns the items ordered by id.
    ///
    /// Backends are free to return items in any order; comparisons against
    /// the local cache use this canonical order.
    pub fn sorted_by_id(&self) -> Vec<Item> {
        let mut items = self.items.clone();
        items.sort_by_key(|item| item.id);
        items
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the snapshot has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
