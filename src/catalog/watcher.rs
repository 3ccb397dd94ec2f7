//! Hot-reload file watcher for the catalog.
//!
//! Watches the data directory and swaps in a fresh snapshot when catalog
//! files are added, modified, or removed.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::CatalogStore;
use crate::Result;

/// File watcher that keeps a [`CatalogStore`] in sync with its directory.
pub struct CatalogWatcher {
    /// The underlying watcher; kept alive for the lifetime of this handle.
    _watcher: Mutex<Option<RecommendedWatcher>>,
}

impl CatalogWatcher {
    /// Start watching the store's data directory.
    ///
    /// Spawns a background task that debounces change events and calls
    /// [`CatalogStore::reload`] once the directory settles.
    ///
    /// # Errors
    ///
    /// Returns an error when the file system watcher cannot be created.
    pub fn start(
        store: Arc<CatalogStore>,
        shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(100);

        let watcher = Self::create_watcher(event_tx, store.data_dir())?;
        Self::spawn_reload_task(store, event_rx, shutdown_rx);

        Ok(Self {
            _watcher: Mutex::new(Some(watcher)),
        })
    }

    /// Create the file system watcher over the data directory.
    fn create_watcher(event_tx: mpsc::Sender<()>, dir: &Path) -> Result<RecommendedWatcher> {
        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) => {
                    let is_relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event
                        .paths
                        .iter()
                        .any(|p| p.extension().is_some_and(|ext| ext == "json"));

                    if is_relevant {
                        debug!(paths = ?event.paths, kind = ?event.kind, "Catalog file change");
                        // Non-blocking send; a full channel means a reload is
                        // already pending.
                        let _ = event_tx.try_send(());
                    }
                }
                Err(e) => {
                    error!(error = %e, "Catalog watcher error");
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| crate::Error::Config(format!("Failed to create catalog watcher: {e}")))?;

        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| crate::Error::Config(format!("Failed to watch {}: {e}", dir.display())))?;
        info!(directory = %dir.display(), "Watching for catalog changes");

        Ok(watcher)
    }

    /// Spawn the background reload task with debouncing.
    fn spawn_reload_task(
        store: Arc<CatalogStore>,
        mut event_rx: mpsc::Receiver<()>,
        mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) {
        tokio::spawn(async move {
            // Wait for the directory to settle before reloading; publishes
            // touch several files in quick succession.
            const DEBOUNCE_MS: u64 = 500;
            let mut last_event: Option<Instant> = None;

            let mut interval = tokio::time::interval(Duration::from_millis(100));

            loop {
                tokio::select! {
                    Some(()) = event_rx.recv() => {
                        last_event = Some(Instant::now());
                    }
                    _ = interval.tick() => {
                        let settled = last_event
                            .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS));
                        if settled {
                            last_event = None;
                            match store.reload() {
                                Ok(count) => info!(records = count, "Catalog reloaded"),
                                Err(e) => warn!(error = %e, "Catalog reload failed, keeping previous snapshot"),
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Catalog watcher shutting down");
                        break;
                    }
                }
            }
        });
    }
}
