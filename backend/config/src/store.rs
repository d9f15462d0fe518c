//! The live configuration snapshot and its file watcher.

use arc_swap::ArcSwapOption;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ConfigLoadError;
use crate::io::load_config;
use crate::schema::BridgeConfig;

/// Holds the active [`BridgeConfig`] and reloads it from the backing file.
///
/// Readers get an `Arc` to a complete snapshot; a reload swaps the pointer,
/// so a reader never sees a half-updated value.
pub struct ConfigStore {
    path: PathBuf,
    current: ArcSwapOption<BridgeConfig>,
}

impl ConfigStore {
    /// Create a store for `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: ArcSwapOption::empty(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing file and, on success, replace the held snapshot.
    ///
    /// On failure the previously held snapshot is left untouched.
    pub async fn load(&self) -> Result<Arc<BridgeConfig>, ConfigLoadError> {
        let config = Arc::new(load_config(&self.path).await?);
        self.current.store(Some(Arc::clone(&config)));

        let resolved = tokio::fs::canonicalize(&self.path)
            .await
            .unwrap_or_else(|_| self.path.clone());
        info!(path = %resolved.display(), "Configuration file loaded");
        Ok(config)
    }

    /// The most recently loaded snapshot, if any load has succeeded.
    pub fn snapshot(&self) -> Option<Arc<BridgeConfig>> {
        self.current.load_full()
    }

    /// Call `on_change` once for every filesystem event that writes or
    /// replaces the config file. Must be called inside a Tokio runtime.
    ///
    /// The parent directory is watched rather than the file itself so that
    /// editors which save by renaming a temp file over the original are seen.
    pub fn watch<F>(&self, on_change: F) -> Result<ConfigWatcher, notify::Error>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, mut rx) = mpsc::channel::<notify::Result<Event>>(100);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Err(e) = tx.blocking_send(res) {
                debug!("Config watch channel closed: {}", e);
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(dir = %dir.display(), file = ?file_name, "Watching configuration file for changes");

        let task = tokio::spawn(async move {
            while let Some(res) = rx.recv().await {
                match res {
                    Ok(event) if is_config_change(&event, &file_name) => {
                        debug!(kind = ?event.kind, "Config file changed");
                        on_change();
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Config watch error: {:?}", e),
                }
            }
            error!("Config watcher stopped delivering events");
        });

        Ok(ConfigWatcher {
            _watcher: watcher,
            task,
        })
    }
}

/// Keeps a config watch alive; dropping it stops notifications.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Whether `event` writes, creates or renames onto the watched file.
fn is_config_change(event: &Event, file_name: &OsString) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
