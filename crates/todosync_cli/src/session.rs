//! Wiring between the command line and the engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use todosync_core::{FileCache, Snapshot};
use todosync_engine::{
    HttpRemote, InconsistencyAlert, LogNotifier, LoopbackClient, MemoryRemote, SyncConfig,
    SyncNotifier, SyncOutcome, SyncedStorage,
};
use tracing::{debug, info, warn};

/// Base URL the loopback client pretends to talk to.
const BACKEND_URL: &str = "loopback://todosync";

/// Remote store used by the CLI.
pub type Remote = HttpRemote<LoopbackClient<Arc<MemoryRemote>>>;

/// Facade used by the CLI.
pub type Storage = SyncedStorage<FileCache, Remote>;

/// Answers every inconsistency alert with a fixed option.
struct AnsweringNotifier {
    answer: String,
    log: LogNotifier,
}

impl SyncNotifier for AnsweringNotifier {
    fn on_sync_finished(&self, outcome: &SyncOutcome) {
        self.log.on_sync_finished(outcome);
    }

    fn on_inconsistency_detected(&self, alert: InconsistencyAlert) {
        eprintln!("{} (answering \"{}\")", alert.message, self.answer);
        if !alert.choose(&self.answer) {
            warn!(answer = %self.answer, "alert has no such option");
        }
    }
}

/// An open cache and backend.
pub struct Session {
    storage: Storage,
    backend: Arc<MemoryRemote>,
    backend_path: PathBuf,
}

impl Session {
    /// Loads the cache and backend state and builds the facade.
    pub fn open(
        cache_path: &Path,
        backend_path: &Path,
        token: Option<String>,
        resync_on_mismatch: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let cache = FileCache::open(cache_path)?;
        let config = SyncConfig::new().with_initial_revision(cache.revision());

        let mut backend = MemoryRemote::from_snapshot(load_backend(backend_path)?);
        if let Some(token) = &token {
            backend = backend.with_token(token.clone());
        }
        let backend = Arc::new(backend);

        let mut remote = HttpRemote::new(BACKEND_URL, LoopbackClient::new(Arc::clone(&backend)))
            .with_device_id("todosync-cli");
        if let Some(token) = token {
            remote = remote.with_token(token);
        }

        let answer = if resync_on_mismatch {
            config.alert.sync_label.clone()
        } else {
            config.alert.ignore_label.clone()
        };
        let notifier = AnsweringNotifier {
            answer,
            log: LogNotifier,
        };

        let storage = SyncedStorage::new(cache, remote, notifier, config)?;
        Ok(Self {
            storage,
            backend,
            backend_path: backend_path.to_path_buf(),
        })
    }

    /// Returns the facade.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Returns the loopback backend.
    pub fn backend(&self) -> &MemoryRemote {
        &self.backend
    }

    /// Waits for every background task to finish.
    pub async fn settle(&self) {
        self.storage.scheduler().wait_idle().await;
    }

    /// Drains background work and writes both files.
    pub async fn close(self) -> Result<(), Box<dyn std::error::Error>> {
        self.settle().await;

        let cache = self.storage.local();
        cache.set_revision(self.storage.last_known_revision());
        cache.save()?;
        save_backend(&self.backend_path, &self.backend.snapshot())?;

        info!(
            cache = %cache.path().display(),
            backend = %self.backend_path.display(),
            "session saved"
        );
        Ok(())
    }
}

fn load_backend(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
    if !path.exists() {
        debug!(path = %path.display(), "backend file missing, starting empty");
        return Ok(Snapshot::default());
    }
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn save_backend(path: &Path, snapshot: &Snapshot) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
