//! # todosync core
//!
//! Data model and local cache stores for todosync.
//!
//! This crate provides:
//! - The synchronized record ([`Item`]) and its value types
//! - Remote revision and snapshot types
//! - The local cache interface ([`LocalStore`])
//! - An in-memory cache and a JSON file backed cache
//!
//! ## Key Invariants
//!
//! - Item identity is the [`ItemId`]; equality is full structural equality
//! - Local stores are internally synchronized and safe to share across threads
//! - Adding an id that is already cached is a no-op

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod file;
mod item;
mod memory;
mod store;
mod types;

pub use error::{CoreError, CoreResult};
pub use file::FileCache;
pub use item::{Item, Snapshot};
pub use memory::MemoryCache;
pub use store::{LocalStore, Upsert};
pub use types::{Color, ItemId, Priority, Revision, Timestamp};
