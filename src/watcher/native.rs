//! Native change source built on OS file events.
//!
//! Watches the parent directory (non-recursive) so a manifest that does not
//! exist yet is still picked up when created. Bursts of events are coalesced
//! into one handler call.

use std::path::PathBuf;
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::watcher::{dispatch, ChangeSource, FileEventHandler, Trigger, WatchError, WatchGuard};

#[derive(Debug, Clone, Default)]
pub struct NativeSource {
    _private: (),
}

impl NativeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    kind.is_create() || kind.is_modify() || kind.is_remove()
}

impl ChangeSource for NativeSource {
    fn install(
        &self,
        path: PathBuf,
        handler: Arc<dyn FileEventHandler>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<WatchGuard, WatchError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let parent = match path.parent() {
            Some(dir) if dir.is_dir() => dir.to_path_buf(),
            _ => return Err(WatchError::MissingDirectory(path)),
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let target = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_relevant(&event.kind) && event.paths.iter().any(|p| p == &target) {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(path = %target.display(), error = ?e, "Watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;

        let task_path = path.clone();
        let task = runtime.spawn(async move {
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        if event.is_none() {
                            break;
                        }
                        while rx.try_recv().is_ok() {}
                        tracing::info!(path = %task_path.display(), "Change detected");
                        dispatch(&handler, &task_path, Trigger::Changed).await;
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!(path = %task_path.display(), "Native watcher stopping");
                        break;
                    }
                }
            }
        });

        tracing::debug!(path = %path.display(), directory = %parent.display(), "Native watcher installed");
        Ok(WatchGuard::new(path, task, Some(watcher)))
    }
}
