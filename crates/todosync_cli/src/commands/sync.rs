//! Sync command implementation.

use crate::session::Session;

/// Runs a full sync and prints what it applied.
pub async fn run(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = session.storage().sync()?.finished().await;
    match (&outcome.report, outcome.revision) {
        (Some(report), Some(revision)) => {
            println!(
                "Synced to {revision}: {} inserted, {} updated",
                report.inserted, report.updated
            );
            Ok(())
        }
        (Some(report), None) => {
            println!(
                "Synced: {} inserted, {} updated",
                report.inserted, report.updated
            );
            Ok(())
        }
        (None, _) => {
            let reason = session
                .storage()
                .stats()
                .last_error
                .unwrap_or_else(|| "remote snapshot unavailable".to_string());
            Err(format!("Sync failed: {reason}").into())
        }
    }
}
