//! Remote store interface and the in-memory authoritative backend.

use crate::error::{RemoteError, RemoteResult};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use todosync_core::{Item, ItemId, Revision, Snapshot};
use tracing::debug;

/// A value returned by a remote mutation together with the new revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The value.
    pub value: T,
    /// Backend revision after the operation.
    pub revision: Revision,
}

impl<T> Versioned<T> {
    /// Creates a versioned value.
    pub fn new(value: T, revision: Revision) -> Self {
        Self { value, revision }
    }
}

/// The authoritative store on the other side of the network.
///
/// Every mutation carries the caller's last-known revision; the backend
/// rejects it with [`RemoteError::UnsynchronizedRevision`] if it is stale.
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetches every item together with the current revision.
    fn fetch_all(&self) -> impl Future<Output = RemoteResult<Snapshot>> + Send;

    /// Creates an item.
    fn create(
        &self,
        item: Item,
        base: Revision,
    ) -> impl Future<Output = RemoteResult<Versioned<Item>>> + Send;

    /// Replaces the item with the given id.
    fn replace(
        &self,
        id: ItemId,
        item: Item,
        base: Revision,
    ) -> impl Future<Output = RemoteResult<Versioned<Item>>> + Send;

    /// Deletes the item with the given id, returning the removed item.
    fn delete(
        &self,
        id: ItemId,
        base: Revision,
    ) -> impl Future<Output = RemoteResult<Versioned<Item>>> + Send;

    /// Fetches a single item.
    fn fetch_one(
        &self,
        id: ItemId,
        base: Revision,
    ) -> impl Future<Output = RemoteResult<Versioned<Item>>> + Send;
}

#[derive(Debug, Default)]
struct BackendState {
    items: Vec<Item>,
    revision: Revision,
}

impl BackendState {
    fn position(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn check_base(&self, base: Revision) -> RemoteResult<()> {
        if base == self.revision {
            Ok(())
        } else {
            Err(RemoteError::UnsynchronizedRevision { sent: base })
        }
    }

    fn bump(&mut self) -> Revision {
        self.revision = self.revision.next();
        self.revision
    }
}

/// An authoritative backend kept in memory.
///
/// Mutations succeed only against the current revision and advance it by
/// one. Test hooks can take the backend offline, inject a one-shot failure
/// or apply a change as if another device had made it.
#[derive(Debug)]
pub struct MemoryRemote {
    state: RwLock<BackendState>,
    online: AtomicBool,
    fail_next: Mutex<Option<RemoteError>>,
    token: Option<String>,
    requests: AtomicU64,
}

impl MemoryRemote {
    /// Creates an empty backend at revision 0.
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    /// Creates a backend holding the given snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(BackendState {
                items: snapshot.items,
                revision: snapshot.revision,
            }),
            online: AtomicBool::new(true),
            fail_next: Mutex::new(None),
            token: None,
            requests: AtomicU64::new(0),
        }
    }

    /// Requires `Authorization: Bearer <token>` on loopback requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns the bearer token loopback requests must carry, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the full state.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot::new(state.items.clone(), state.revision)
    }

    /// Returns the current revision.
    pub fn revision(&self) -> Revision {
        self.state.read().revision
    }

    /// Returns the number of requests served (including failed ones).
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Takes the backend on- or offline.
    ///
    /// While offline every request fails with a retryable transport error.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Returns true if the backend is reachable.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Makes the next request fail with `err`.
    pub fn fail_next(&self, err: RemoteError) {
        *self.fail_next.lock() = Some(err);
    }

    /// Upserts an item as another device would, advancing the revision.
    pub fn apply_external(&self, item: Item) -> Revision {
        let mut state = self.state.write();
        match state.position(item.id) {
            Some(pos) => state.items[pos] = item,
            None => state.items.push(item),
        }
        state.bump()
    }

    /// Removes an item as another device would, advancing the revision.
    pub fn remove_external(&self, id: ItemId) -> Option<Revision> {
        let mut state = self.state.write();
        let pos = state.position(id)?;
        state.items.remove(pos);
        Some(state.bump())
    }

    fn begin(&self) -> RemoteResult<()> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !self.is_online() {
            return Err(RemoteError::transport_retryable("backend offline"));
        }
        match self.fail_next.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn list_now(&self) -> RemoteResult<Snapshot> {
        self.begin()?;
        Ok(self.snapshot())
    }

    pub(crate) fn create_now(&self, item: Item, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.begin()?;
        let mut state = self.state.write();
        state.check_base(base)?;
        if state.position(item.id).is_some() {
            return Err(RemoteError::Rejected(format!("item {} already exists", item.id)));
        }
        state.items.push(item.clone());
        let revision = state.bump();
        debug!(item_id = %item.id, revision = revision.as_u64(), "backend created item");
        Ok(Versioned::new(item, revision))
    }

    pub(crate) fn replace_now(
        &self,
        id: ItemId,
        item: Item,
        base: Revision,
    ) -> RemoteResult<Versioned<Item>> {
        self.begin()?;
        let mut state = self.state.write();
        state.check_base(base)?;
        let pos = state.position(id).ok_or(RemoteError::NotFound)?;
        state.items[pos] = item.clone();
        let revision = state.bump();
        debug!(item_id = %id, revision = revision.as_u64(), "backend replaced item");
        Ok(Versioned::new(item, revision))
    }

    pub(crate) fn delete_now(&self, id: ItemId, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.begin()?;
        let mut state = self.state.write();
        state.check_base(base)?;
        let pos = state.position(id).ok_or(RemoteError::NotFound)?;
        let removed = state.items.remove(pos);
        let revision = state.bump();
        debug!(item_id = %id, revision = revision.as_u64(), "backend deleted item");
        Ok(Versioned::new(removed, revision))
    }

    pub(crate) fn fetch_one_now(&self, id: ItemId) -> RemoteResult<Versioned<Item>> {
        self.begin()?;
        let state = self.state.read();
        let pos = state.position(id).ok_or(RemoteError::NotFound)?;
        Ok(Versioned::new(state.items[pos].clone(), state.revision))
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryRemote {
    async fn fetch_all(&self) -> RemoteResult<Snapshot> {
        self.list_now()
    }

    async fn create(&self, item: Item, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.create_now(item, base)
    }

    async fn replace(
        &self,
        id: ItemId,
        item: Item,
        base: Revision,
    ) -> RemoteResult<Versioned<Item>> {
        self.replace_now(id, item, base)
    }

    async fn delete(&self, id: ItemId, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.delete_now(id, base)
    }

    async fn fetch_one(&self, id: ItemId, _base: Revision) -> RemoteResult<Versioned<Item>> {
        self.fetch_one_now(id)
    }
}

impl<R: RemoteStore> RemoteStore for std::sync::Arc<R> {
    fn fetch_all(&self) -> impl Future<Output = RemoteResult<Snapshot>> + Send {
        (**self).fetch_all()
    }

    fn create(
        &self,
        item: Item,
        base: Revision,
    ) -> impl Future<Output = RemoteResult<Versioned<Item>>> + Send {
        (**self).create(item, base)
    }

    fn replace(
        &self,
        id: ItemId,
        item: Item,
        base: Revision,
    ) -> impl Future<Output = RemoteResult<Versioned<Item>>> + Send {
        (**self).replace(id, item, base)
    }

    fn delete(
        &self,
        id: ItemId,
        base: Revision,
    ) -> impl Future<Output = RemoteResult<Versioned<Item>>> + Send {
        (**self).delete(id, base)
    }

    fn fetch_one(
        &self,
        id: ItemId,
        base: Revision,
    ) -> impl Future<Output = RemoteResult<Versioned<Item>>> + Send {
        (**self).fetch_one(id, base)
    }
}
