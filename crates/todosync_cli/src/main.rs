//! todosync CLI
//!
//! Drives a [`SyncedStorage`](todosync_engine::SyncedStorage) from the
//! command line: a JSON file cache on one side, a loopback backend persisted
//! to JSON on the other.
//!
//! # Commands
//!
//! - `list` - List cached items
//! - `get` - Show one item
//! - `add` - Create an item
//! - `done` - Mark an item completed
//! - `edit` - Replace an item's text
//! - `remove` - Delete an item
//! - `sync` - Pull the remote snapshot into the cache
//! - `status` - Show revisions and counters

mod commands;
mod session;

use clap::{Parser, Subcommand, ValueEnum};
use session::Session;
use std::path::PathBuf;
use todosync_core::{Color, CoreError, ItemId, Priority};
use tracing_subscriber::EnvFilter;

/// Offline-first to-do list with background sync.
#[derive(Parser)]
#[command(name = "todosync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local cache file
    #[arg(global = true, long, default_value = "todosync-cache.json")]
    cache: PathBuf,

    /// Path to the loopback backend state
    #[arg(global = true, long, default_value = "todosync-remote.json")]
    remote: PathBuf,

    /// Bearer token for the backend
    #[arg(global = true, long)]
    token: Option<String>,

    /// Answer inconsistency alerts by syncing instead of ignoring them
    #[arg(global = true, long)]
    resync_on_mismatch: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for item listings and status.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List cached items
    List,

    /// Show one item
    Get {
        /// Item id
        id: ItemId,
    },

    /// Create an item
    Add {
        /// Item text
        text: String,

        /// Priority (low, normal, important)
        #[arg(short, long, default_value = "normal")]
        priority: Priority,

        /// Deadline in seconds since the Unix epoch
        #[arg(short, long)]
        deadline: Option<i64>,

        /// Color as #RRGGBB or #RRGGBBAA
        #[arg(short, long, value_parser = parse_color)]
        color: Option<Color>,
    },

    /// Mark an item completed
    Done {
        /// Item id
        id: ItemId,
    },

    /// Replace an item's text
    Edit {
        /// Item id
        id: ItemId,

        /// New text
        text: String,
    },

    /// Delete an item
    Remove {
        /// Item id
        id: ItemId,
    },

    /// Pull the remote snapshot into the cache
    Sync,

    /// Show revisions and counters
    Status,
}

fn parse_color(value: &str) -> Result<Color, CoreError> {
    Color::from_hex(value)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let session = Session::open(
        &cli.cache,
        &cli.remote,
        cli.token.clone(),
        cli.resync_on_mismatch,
    )?;

    let result = match cli.command {
        Commands::List => commands::items::list(&session, cli.format),
        Commands::Get { id } => commands::items::get(&session, id, cli.format),
        Commands::Add {
            text,
            priority,
            deadline,
            color,
        } => commands::items::add(&session, text, priority, deadline, color),
        Commands::Done { id } => commands::items::done(&session, id),
        Commands::Edit { id, text } => commands::items::edit(&session, id, text),
        Commands::Remove { id } => commands::items::remove(&session, id),
        Commands::Sync => commands::sync::run(&session).await,
        Commands::Status => commands::status::run(&session, cli.format).await,
    };

    // Persist even when the command failed; the background legs may have
    // advanced the revision.
    session.close().await?;
    result
}
