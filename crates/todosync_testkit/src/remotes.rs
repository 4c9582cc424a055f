//! Instrumented remote stores.
//!
//! Stubs for the remote collaborator that never answer, answer late, or
//! always fail. All of them count the calls they receive.

use std::future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use todosync_core::{Item, ItemId, Revision, Snapshot};
use todosync_engine::{RemoteError, RemoteResult, RemoteStore, Versioned};

/// A remote whose calls never complete.
#[derive(Debug, Default)]
pub struct PendingRemote {
    calls: AtomicU64,
}

impl PendingRemote {
    /// Creates the stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls started.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn never<T>(&self) -> RemoteResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        future::pending().await
    }
}

impl RemoteStore for PendingRemote {
    async fn fetch_all(&self) -> RemoteResult<Snapshot> {
        self.never().await
    }

    async fn create(&self, _item: Item, _base: Revision) -> RemoteResult<Versioned<Item>> {
        self.never().await
    }

    async fn replace(
        &self,
        _id: ItemId,
        _item: Item,
        _base: Revision,
    ) -> RemoteResult<Versioned<Item>> {
        self.never().await
    }

    async fn delete(&self, _id: ItemId, _base: Revision) -> RemoteResult<Versioned<Item>> {
        self.never().await
    }

    async fn fetch_one(&self, _id: ItemId, _base: Revision) -> RemoteResult<Versioned<Item>> {
        self.never().await
    }
}

/// Delays every call to an inner remote.
#[derive(Debug)]
pub struct DelayedRemote<R> {
    inner: R,
    delay: Duration,
    calls: AtomicU64,
}

impl<R: RemoteStore> DelayedRemote<R> {
    /// Wraps `inner`, delaying each call by `delay`.
    pub fn new(inner: R, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            calls: AtomicU64::new(0),
        }
    }

    /// Returns the wrapped remote.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Number of calls started.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
    }
}

impl<R: RemoteStore> RemoteStore for DelayedRemote<R> {
    async fn fetch_all(&self) -> RemoteResult<Snapshot> {
        self.pause().await;
        self.inner.fetch_all().await
    }

    async fn create(&self, item: Item, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.pause().await;
        self.inner.create(item, base).await
    }

    async fn replace(
        &self,
        id: ItemId,
        item: Item,
        base: Revision,
    ) -> RemoteResult<Versioned<Item>> {
        self.pause().await;
        self.inner.replace(id, item, base).await
    }

    async fn delete(&self, id: ItemId, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.pause().await;
        self.inner.delete(id, base).await
    }

    async fn fetch_one(&self, id: ItemId, base: Revision) -> RemoteResult<Versioned<Item>> {
        self.pause().await;
        self.inner.fetch_one(id, base).await
    }
}

/// A remote that fails every call with the same error.
#[derive(Debug)]
pub struct FailingRemote {
    error: RemoteError,
    calls: AtomicU64,
}

impl FailingRemote {
    /// Fails every call with `error`.
    pub fn new(error: RemoteError) -> Self {
        Self {
            error,
            calls: AtomicU64::new(0),
        }
    }

    /// Fails every call with a retryable transport error.
    pub fn offline() -> Self {
        Self::new(RemoteError::transport_retryable("connection refused"))
    }

    /// Number of calls received.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> RemoteResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

impl RemoteStore for FailingRemote {
    async fn fetch_all(&self) -> RemoteResult<Snapshot> {
        self.fail()
    }

    async fn create(&self, _item: Item, _base: Revision) -> RemoteResult<Versioned<Item>> {
        self.fail()
    }

    async fn replace(
        &self,
        _id: ItemId,
        _item: Item,
        _base: Revision,
    ) -> RemoteResult<Versioned<Item>> {
        self.fail()
    }

    async fn delete(&self, _id: ItemId, _base: Revision) -> RemoteResult<Versioned<Item>> {
        self.fail()
    }

    async fn fetch_one(&self, _id: ItemId, _base: Revision) -> RemoteResult<Versioned<Item>> {
        self.fail()
    }
}
