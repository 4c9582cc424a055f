//! Request and response envelopes.

use crate::error::ProtocolResult;
use crate::model::ItemModel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use todosync_core::{Item, Revision, Snapshot};

/// Status string of a successful response.
pub const STATUS_OK: &str = "ok";

/// Encodes a message body as JSON.
pub fn encode<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Decodes a JSON message body.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Response to `GET /list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    /// `"ok"` on success.
    pub status: String,
    /// Every item on the backend.
    pub list: Vec<ItemModel>,
    /// Backend revision the list was read at.
    pub revision: u64,
}

impl ListResponse {
    /// Creates a successful list response.
    pub fn ok(list: Vec<ItemModel>, revision: Revision) -> Self {
        Self {
            status: STATUS_OK.into(),
            list,
            revision: revision.as_u64(),
        }
    }

    /// Converts into a snapshot of domain items.
    pub fn into_snapshot(self) -> ProtocolResult<Snapshot> {
        let items = self
            .list
            .into_iter()
            .map(ItemModel::into_item)
            .collect::<ProtocolResult<Vec<Item>>>()?;
        Ok(Snapshot::new(items, Revision::new(self.revision)))
    }
}

/// Body of `POST /list` and `PUT /list/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRequest {
    /// The item to create or replace.
    pub element: ItemModel,
}

impl ElementRequest {
    /// Wraps an item model.
    pub fn new(element: ItemModel) -> Self {
        Self { element }
    }
}

/// Response to every single-item endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementResponse {
    /// `"ok"` on success.
    pub status: String,
    /// The item after the operation (the removed item for `DELETE`).
    pub element: ItemModel,
    /// Backend revision after the operation.
    pub revision: u64,
}

impl ElementResponse {
    /// Creates a successful element response.
    pub fn ok(element: ItemModel, revision: Revision) -> Self {
        Self {
            status: STATUS_OK.into(),
            element,
            revision: revision.as_u64(),
        }
    }

    /// Returns the revision as a domain type.
    pub fn revision(&self) -> Revision {
        Revision::new(self.revision)
    }
}
