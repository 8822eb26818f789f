use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::apply_to_tree;
use super::decode_document;
use super::encode_tree;
use super::NodeSpec;
use crate::file_io::read_if_exists;
use crate::file_io::remove_file_if_exists;
use crate::file_io::rename_file;
use crate::file_io::sibling_with_suffix;
use crate::file_io::write_file_atomically;
use crate::metrics::SNAPSHOT_WRITES_TOTAL;
use crate::NodeTree;
use crate::Result;
use crate::SnapshotError;
use crate::SystemError;

/// Where [`SnapshotManager::restore`] found the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Primary,
    Backup,
    /// Neither file existed
    Empty,
}

struct FlushTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Debounced, backup-rotated persistence of a [`NodeTree`].
///
/// Mutations only raise a dirty flag; a background task started with
/// [`SnapshotManager::start`] writes the tree once per interval while the flag
/// is set. Every write goes through `write_lock`, so manual flushes, timer
/// flushes, restores and `stop` never overlap.
pub struct SnapshotManager {
    primary: PathBuf,
    backup: PathBuf,
    corrupt: PathBuf,
    tree: Arc<NodeTree>,
    changed: Arc<AtomicBool>,
    interval: Duration,
    timer: Mutex<Option<FlushTask>>,
    write_lock: Mutex<()>,
    writes: AtomicU64,
}

impl SnapshotManager {
    pub fn new(
        primary: impl Into<PathBuf>,
        tree: Arc<NodeTree>,
        interval: Duration,
    ) -> Self {
        let primary = primary.into();
        Self {
            backup: sibling_with_suffix(&primary, "bak"),
            corrupt: sibling_with_suffix(&primary, "corrupt"),
            primary,
            tree,
            changed: Arc::new(AtomicBool::new(false)),
            interval,
            timer: Mutex::new(None),
            write_lock: Mutex::new(()),
            writes: AtomicU64::new(0),
        }
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn corrupt_path(&self) -> &Path {
        &self.corrupt
    }

    /// Shared dirty flag, for components that must not hold the manager.
    pub fn dirty_flag(&self) -> Arc<AtomicBool> {
        self.changed.clone()
    }

    /// Number of successful writes since creation.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    pub fn mark_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }

    pub fn mark_changed_override(
        &self,
        changed: bool,
    ) {
        self.changed.store(changed, Ordering::Release);
    }

    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Arms the periodic flush. A running task is stopped first.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| SystemError::NoRuntime(e.to_string()))?;
        // held until the new task is stored, so concurrent start/stop calls serialize
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            self.disarm(previous);
        }

        let token = CancellationToken::new();
        let manager = self.clone();
        let task_token = token.clone();
        let interval = self.interval;
        let handle = runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let manager = manager.clone();
                        let token = task_token.clone();
                        let flushed = tokio::task::spawn_blocking(move || manager.flush_on_tick(&token)).await;
                        if let Err(e) = flushed {
                            error!(error = %e, "snapshot flush task failed");
                        }
                    }
                }
            }
            debug!("snapshot flush loop exited");
        });

        *timer = Some(FlushTask { token, handle });
        info!(path = ?self.primary, interval_ms = self.interval.as_millis() as u64, "snapshot flush started");
        Ok(())
    }

    /// Disarms the periodic flush and waits for an in-flight write. Safe to
    /// call when never started.
    pub fn stop(&self) {
        let mut timer = self.timer.lock();
        if let Some(task) = timer.take() {
            self.disarm(task);
        }
    }

    /// Lock order: `timer`, then `write_lock`.
    fn disarm(
        &self,
        task: FlushTask,
    ) {
        task.token.cancel();
        // an in-flight flush holds the write lock until it is done
        drop(self.write_lock.lock());
        drop(task.handle);
        info!(path = ?self.primary, "snapshot flush stopped");
    }

    fn flush_on_tick(
        &self,
        token: &CancellationToken,
    ) {
        let _guard = self.write_lock.lock();
        if token.is_cancelled() {
            return;
        }
        if let Err(e) = self.flush_if_changed_locked() {
            error!(path = ?self.primary, error = %e, "snapshot write failed, retrying next cycle");
        }
    }

    /// Writes the tree when it changed since the last write. Returns whether
    /// a write happened.
    pub fn flush_if_changed(&self) -> Result<bool> {
        let _guard = self.write_lock.lock();
        self.flush_if_changed_locked()
    }

    fn flush_if_changed_locked(&self) -> Result<bool> {
        if !self.changed.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        self.write_locked().map(|()| true)
    }

    /// Writes the tree now, dirty or not.
    pub fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.changed.store(false, Ordering::Release);
        self.write_locked()
    }

    fn write_locked(&self) -> Result<()> {
        match self.write_snapshot() {
            Ok(()) => {
                self.writes.fetch_add(1, Ordering::Relaxed);
                SNAPSHOT_WRITES_TOTAL.with_label_values(&["ok"]).inc();
                debug!(path = ?self.primary, "snapshot written");
                Ok(())
            }
            Err(e) => {
                // retried on the next cycle
                self.changed.store(true, Ordering::Release);
                SNAPSHOT_WRITES_TOTAL.with_label_values(&["failed"]).inc();
                Err(e)
            }
        }
    }

    fn write_snapshot(&self) -> Result<()> {
        let document = encode_tree(&self.tree);
        let bytes = serde_json::to_vec_pretty(&document)?;

        if self.primary.exists() {
            remove_file_if_exists(&self.backup)?;
            rename_file(&self.primary, &self.backup)?;
        }
        write_file_atomically(&self.primary, &bytes)
    }

    /// Loads the tree from disk.
    ///
    /// An unreadable primary is kept as `<primary>.corrupt` and the backup is
    /// tried once; when that fails too the error is fatal.
    pub fn restore(&self) -> Result<RestoreSource> {
        let _guard = self.write_lock.lock();

        let primary_failed = match self.load(&self.primary) {
            Ok(Some(content)) => {
                apply_to_tree(&self.tree, content)?;
                self.changed.store(false, Ordering::Release);
                info!(path = ?self.primary, "snapshot restored");
                return Ok(RestoreSource::Primary);
            }
            Ok(None) => false,
            Err(e) => {
                warn!(path = ?self.primary, error = %e, "primary snapshot unreadable, falling back to backup");
                self.preserve_corrupt_primary();
                true
            }
        };

        match self.load(&self.backup) {
            Ok(Some(content)) => {
                apply_to_tree(&self.tree, content)?;
                self.rewrite_primary_from_backup()?;
                self.changed.store(false, Ordering::Release);
                info!(path = ?self.backup, "snapshot restored from backup");
                Ok(RestoreSource::Backup)
            }
            Ok(None) if !primary_failed => {
                info!(path = ?self.primary, "no snapshot found, starting with an empty tree");
                Ok(RestoreSource::Empty)
            }
            Ok(None) | Err(_) => {
                error!(primary = ?self.primary, backup = ?self.backup, "no readable snapshot");
                Err(SnapshotError::Unrecoverable {
                    primary: self.primary.clone(),
                    backup: self.backup.clone(),
                }
                .into())
            }
        }
    }

    fn load(
        &self,
        path: &Path,
    ) -> Result<Option<NodeSpec>> {
        let Some(bytes) = read_if_exists(path)? else {
            return Ok(None);
        };
        decode_document(&bytes).map(Some).map_err(|reason| {
            SnapshotError::Corrupt {
                path: path.to_path_buf(),
                reason,
            }
            .into()
        })
    }

    fn preserve_corrupt_primary(&self) {
        let preserved = remove_file_if_exists(&self.corrupt).and_then(|_| rename_file(&self.primary, &self.corrupt));
        match preserved {
            Ok(()) => warn!(path = ?self.corrupt, "corrupt snapshot preserved"),
            Err(e) => warn!(path = ?self.primary, error = %e, "could not preserve corrupt snapshot"),
        }
    }

    fn rewrite_primary_from_backup(&self) -> Result<()> {
        let Some(bytes) = read_if_exists(&self.backup)? else {
            return Ok(());
        };
        write_file_atomically(&self.primary, &bytes)
    }
}
