//! # todosync testkit
//!
//! Test utilities for todosync.
//!
//! This crate provides:
//! - Fixtures: items with fixed ids, temporary file caches, facades wired
//!   for tests
//! - Property-based test generators using proptest
//! - Instrumented remote stores (delayed, never-completing, failing)
//! - A notifier that records events and can answer alerts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use todosync_testkit::prelude::*;
//!
//! #[tokio::test(flavor = "multi_thread")]
//! async fn test_with_storage() {
//!     let notifier = RecordingNotifier::new();
//!     let storage = memory_storage(MemoryRemote::new(), &notifier);
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod notifier;
pub mod remotes;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::notifier::*;
    pub use crate::remotes::*;
    pub use todosync_core::{Item, ItemId, LocalStore, MemoryCache, Revision, Snapshot};
    pub use todosync_engine::{MemoryRemote, RemoteError, SyncConfig, SyncedStorage};
}

pub use fixtures::*;
pub use generators::*;
pub use notifier::*;
pub use remotes::*;
