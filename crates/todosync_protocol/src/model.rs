//! Backend representation of an item.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use todosync_core::{Color, Item, ItemId, Priority, Timestamp};

/// Importance as named by the backend.
///
/// The backend calls the default priority `basic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Maps to [`Priority::Low`].
    Low,
    /// Maps to [`Priority::Normal`].
    Basic,
    /// Maps to [`Priority::Important`].
    Important,
}

impl From<Priority> for Importance {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => Importance::Low,
            Priority::Normal => Importance::Basic,
            Priority::Important => Importance::Important,
        }
    }
}

impl From<Importance> for Priority {
    fn from(importance: Importance) -> Self {
        match importance {
            Importance::Low => Priority::Low,
            Importance::Basic => Priority::Normal,
            Importance::Important => Priority::Important,
        }
    }
}

/// An item as it travels over the wire.
///
/// Field names are snake case; times are whole seconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemModel {
    /// Item id as a UUID string.
    pub id: String,
    /// Free text.
    pub text: String,
    /// Importance.
    pub importance: Importance,
    /// Optional deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<i64>,
    /// Completion flag.
    #[serde(default)]
    pub done: bool,
    /// Optional `#RRGGBB` color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Creation time.
    pub created_at: i64,
    /// Last modification time.
    pub changed_at: i64,
    /// Device that made the last change.
    #[serde(default)]
    pub last_updated_by: String,
}

impl ItemModel {
    /// Converts a domain item, stamping it with the sending device.
    pub fn from_item(item: &Item, device_id: &str) -> Self {
        Self {
            id: item.id.to_string(),
            text: item.text.clone(),
            importance: item.priority.into(),
            deadline: item.deadline.map(Timestamp::as_secs),
            done: item.done,
            color: item.color.map(|c| c.to_hex()),
            created_at: item.created_at.as_secs(),
            changed_at: item.changed_at.as_secs(),
            last_updated_by: device_id.to_string(),
        }
    }

    /// Converts back into a domain item.
    ///
    /// The device stamp is dropped; it is not part of item equality.
    pub fn into_item(self) -> ProtocolResult<Item> {
        let id: ItemId = self
            .id
            .parse()
            .map_err(|_| ProtocolError::invalid_field("id", format!("not a UUID: {}", self.id)))?;
        let color = self
            .color
            .as_deref()
            .map(Color::from_hex)
            .transpose()
            .map_err(|e| ProtocolError::invalid_field("color", e.to_string()))?;

        Ok(Item {
            id,
            text: self.text,
            priority: self.importance.into(),
            deadline: self.deadline.map(Timestamp::from_secs),
            color,
            done: self.done,
            created_at: Timestamp::from_secs(self.created_at),
            changed_at: Timestamp::from_secs(self.changed_at),
        })
    }
}
