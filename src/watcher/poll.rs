//! Metadata polling change source.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::watcher::{dispatch, ChangeSource, FileEventHandler, Trigger, WatchError, WatchGuard};

/// Default interval between metadata checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What a poll observed about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stamp {
    Missing,
    Present { modified: Option<SystemTime>, len: u64 },
}

impl Stamp {
    pub(crate) fn read(path: &Path) -> Self {
        Self::from_metadata(path, std::fs::metadata(path))
    }

    async fn read_async(path: &Path) -> Self {
        Self::from_metadata(path, tokio::fs::metadata(path).await)
    }

    fn from_metadata(path: &Path, metadata: io::Result<Metadata>) -> Self {
        match metadata {
            Ok(meta) => Stamp::Present { modified: meta.modified().ok(), len: meta.len() },
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = %e, "Manifest metadata unreadable");
                }
                Stamp::Missing
            }
        }
    }
}

/// Detects changes by comparing modification time and length on a fixed interval.
///
/// A present → missing transition fires the handler too; missing → missing does not.
#[derive(Debug, Clone)]
pub struct PollSource {
    interval: Duration,
}

impl PollSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for PollSource {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ChangeSource for PollSource {
    fn install(
        &self,
        path: PathBuf,
        handler: Arc<dyn FileEventHandler>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<WatchGuard, WatchError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let baseline = Stamp::read(&path);
        let task = runtime.spawn(poll_loop(path.clone(), handler, self.interval, baseline, shutdown));

        tracing::debug!(path = %path.display(), interval = ?self.interval, "Polling watcher installed");
        Ok(WatchGuard::new(path, task, None))
    }
}

async fn poll_loop(
    path: PathBuf,
    handler: Arc<dyn FileEventHandler>,
    interval: Duration,
    mut last: Stamp,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let current = Stamp::read_async(&path).await;
                if current == last {
                    continue;
                }
                last = current;
                tracing::info!(path = %path.display(), "Change detected");
                dispatch(&handler, &path, Trigger::Changed).await;
            }
            _ = shutdown.recv() => {
                tracing::debug!(path = %path.display(), "Polling watcher stopping");
                break;
            }
        }
    }
}
