//! Status command implementation.

use crate::session::Session;
use crate::Format;
use serde::Serialize;
use todosync_core::LocalStore;

/// Session status.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Cache file path.
    pub cache: String,
    /// Number of cached items.
    pub cached_items: usize,
    /// Last-known remote revision.
    pub last_known_revision: u64,
    /// Revision held by the backend.
    pub backend_revision: u64,
    /// Number of items held by the backend.
    pub backend_items: usize,
    /// Remote mutations that failed this session.
    pub remote_writes_failed: u64,
    /// Last remote error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Prints the session status once background work has drained.
pub async fn run(session: &Session, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    session.settle().await;

    let storage = session.storage();
    let stats = storage.stats();
    let backend = session.backend().snapshot();
    let report = StatusReport {
        cache: storage.local().path().display().to_string(),
        cached_items: storage.local().list().len(),
        last_known_revision: storage.last_known_revision().as_u64(),
        backend_revision: backend.revision.as_u64(),
        backend_items: backend.len(),
        remote_writes_failed: stats.remote_writes_failed,
        last_error: stats.last_error,
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => {
            println!("Cache:               {}", report.cache);
            println!("Cached items:        {}", report.cached_items);
            println!("Last-known revision: {}", report.last_known_revision);
            println!("Backend revision:    {}", report.backend_revision);
            println!("Backend items:       {}", report.backend_items);
            if report.last_known_revision < report.backend_revision {
                println!();
                println!("Cache is behind the backend; run `todosync sync`");
            }
            if let Some(error) = &report.last_error {
                println!("Last remote error:   {error}");
            }
        }
    }
    Ok(())
}
