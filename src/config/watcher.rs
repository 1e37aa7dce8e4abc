//! Configuration file watcher for hot reload.

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::BroadcastConfig;

/// Atomically swappable configuration shared by every invocation.
///
/// Readers take a [`snapshot`](SharedConfig::snapshot) once and keep it for
/// the whole invocation; a concurrent swap never changes a snapshot.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<ArcSwap<BroadcastConfig>>,
}

impl SharedConfig {
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current configuration.
    pub fn snapshot(&self) -> Arc<BroadcastConfig> {
        self.inner.load_full()
    }

    /// Replace the configuration for future snapshots.
    pub fn store(&self, config: BroadcastConfig) {
        self.inner.store(Arc::new(config));
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(BroadcastConfig::default())
    }
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<BroadcastConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<BroadcastConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are
    /// wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    error = %e,
                                    "Failed to reload config. Keeping current configuration."
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply reloads from `updates` to `shared` until the sender is dropped.
pub async fn apply_updates(
    shared: SharedConfig,
    mut updates: mpsc::UnboundedReceiver<BroadcastConfig>,
) {
    while let Some(config) = updates.recv().await {
        shared.store(config);
        tracing::info!("Configuration reloaded");
    }
}

/// Watch `path` and keep `shared` current. Returns the live watcher handle.
pub fn spawn_hot_reload(
    path: &Path,
    shared: SharedConfig,
) -> Result<RecommendedWatcher, notify::Error> {
    let (watcher, updates) = ConfigWatcher::new(path);
    let handle = watcher.run()?;
    tokio::spawn(apply_updates(shared, updates));
    Ok(handle)
}
