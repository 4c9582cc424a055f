//! # todosync engine
//!
//! Storage synchronization engine for todosync.
//!
//! This crate provides:
//! - [`RemoteStore`], the remote collaborator interface, with an in-memory
//!   authoritative backend ([`MemoryRemote`]) and an HTTP adapter
//!   ([`HttpRemote`])
//! - Read-repair consistency checks ([`read_repair`])
//! - Bulk reconciliation of a remote snapshot ([`reconcile`],
//!   [`SyncPipeline`])
//! - The [`SyncedStorage`] facade combining a local cache and a remote store
//!
//! ## Architecture
//!
//! The facade answers every call from the local cache and schedules the
//! remote leg on a bounded [`Scheduler`](todosync_tasks::Scheduler):
//! 1. Reads compare the local answer with a remote read once it arrives and
//!    raise an alert through the [`SyncNotifier`] on mismatch
//! 2. Writes are propagated in call order, each carrying the last-known
//!    revision
//! 3. `sync()` runs fetch → transfer → update → notify
//!
//! ## Key Invariants
//!
//! - Callers never wait for the remote store
//! - The local cache is authoritative for the caller; remote write failures
//!   are logged, never returned
//! - The last-known revision never decreases
//! - Reconciliation upserts and never deletes local-only items (unless
//!   [`ReconcileMode::Replace`] is configured)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod http;
mod notify;
mod reconcile;
mod remote;
mod revision;
mod storage;
mod validator;

pub use config::{AlertConfig, SyncConfig};
pub use error::{RemoteError, RemoteResult, SyncError, SyncResult};
pub use http::{HttpClient, HttpRemote, HttpRequest, HttpResponse, LoopbackClient, LoopbackServer};
pub use notify::{
    AlertOption, ChannelNotifier, InconsistencyAlert, LogNotifier, SyncEvent, SyncNotifier,
};
pub use reconcile::{reconcile, ReconcileMode, ReconcileReport, SyncOutcome, SyncPipeline};
pub use remote::{MemoryRemote, RemoteStore, Versioned};
pub use revision::RevisionTracker;
pub use storage::{SyncStats, SyncedStorage};
pub use validator::{read_repair, ConsistencyCheck, Verdict};
