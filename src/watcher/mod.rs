//! File watching subsystem.
//!
//! # Data Flow
//! ```text
//! FileWatcher::watch(path)
//!     → ChangeSource::install (baseline captured, task spawned)
//!     → eager Trigger::Initial call on the blocking pool if the file exists now
//!
//! On change:
//!     poll.rs (metadata stamp differs)   ┐
//!     native.rs (OS event for the path)  ┴→ FileEventHandler::on_file_event(path, Changed)
//! ```
//!
//! # Design Decisions
//! - The watcher only decides "something changed" and re-delivers the path;
//!   content comparison belongs to the pipeline
//! - Polling is the default because native events are unreliable on network
//!   and bind-mounted filesystems
//! - Handler calls run on the blocking pool and are awaited, so one change is
//!   fully handled before the next check for that path
//! - Each path has its own task; one path failing never affects another

pub mod native;
pub mod poll;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

pub use native::NativeSource;
pub use poll::PollSource;

/// What caused a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Eager load when the watch was installed and the file already existed.
    Initial,
    /// A change detected after installation.
    Changed,
}

/// Receives change notifications for a watched path.
pub trait FileEventHandler: Send + Sync + 'static {
    fn on_file_event(&self, path: &Path, trigger: Trigger);
}

impl<F> FileEventHandler for F
where
    F: Fn(&Path, Trigger) + Send + Sync + 'static,
{
    fn on_file_event(&self, path: &Path, trigger: Trigger) {
        self(path, trigger)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("watchers must be installed from within a tokio runtime")]
    NoRuntime,

    #[error("cannot watch {0}: parent directory does not exist")]
    MissingDirectory(PathBuf),

    #[error("native watcher error: {0}")]
    Native(#[from] notify::Error),
}

/// The primitive that detects changes for one path.
///
/// Implementations capture their baseline synchronously inside `install`, so
/// a change racing with the eager load is still observed afterwards.
pub trait ChangeSource: Send + Sync {
    fn install(
        &self,
        path: PathBuf,
        handler: Arc<dyn FileEventHandler>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<WatchGuard, WatchError>;
}

/// Keeps a watch alive. Dropping the guard stops watching.
pub struct WatchGuard {
    path: PathBuf,
    task: JoinHandle<()>,
    _native: Option<RecommendedWatcher>,
}

impl WatchGuard {
    pub(crate) fn new(path: PathBuf, task: JoinHandle<()>, native: Option<RecommendedWatcher>) -> Self {
        Self { path, task, _native: native }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Installs watches with an eager first invocation.
#[derive(Clone)]
pub struct FileWatcher {
    source: Arc<dyn ChangeSource>,
}

impl FileWatcher {
    pub fn new(source: Arc<dyn ChangeSource>) -> Self {
        Self { source }
    }

    pub fn polling(interval: Duration) -> Self {
        Self::new(Arc::new(PollSource::new(interval)))
    }

    pub fn native() -> Self {
        Self::new(Arc::new(NativeSource::new()))
    }

    /// Start watching `path`.
    ///
    /// When `eager` is set and the file exists right now, the handler is
    /// invoked once with [`Trigger::Initial`] on the blocking pool, and this
    /// resolves after it returns. A missing file is still watched so a later
    /// creation is caught.
    pub async fn watch(
        &self,
        path: &Path,
        handler: Arc<dyn FileEventHandler>,
        eager: bool,
        shutdown: &Shutdown,
    ) -> Result<WatchGuard, WatchError> {
        let exists = path.exists();
        let guard = self
            .source
            .install(path.to_path_buf(), handler.clone(), shutdown.subscribe())?;

        if eager && exists {
            dispatch(&handler, path, Trigger::Initial).await;
        } else if !exists {
            tracing::info!(path = %path.display(), "Manifest not present yet, waiting for it to be created");
        }

        Ok(guard)
    }
}

/// Run a handler on the blocking pool and wait for it.
pub(crate) async fn dispatch(handler: &Arc<dyn FileEventHandler>, path: &Path, trigger: Trigger) {
    let handler = handler.clone();
    let owned = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || handler.on_file_event(&owned, trigger)).await;
    if let Err(e) = result {
        tracing::error!(path = %path.display(), error = %e, "Manifest handler failed");
    }
}
