//! The reconciliation engine.
//!
//! Owns the manifest store, the forward pipeline, the optional reverse mirror
//! and the watch guards for every configured path. Constructed once at host
//! startup and held for the life of the host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::config::{ResolvedSettings, WatchBackend};
use crate::lifecycle::Shutdown;
use crate::manifest::ValidatedManifest;
use crate::observability::metrics;
use crate::reconcile::{ForwardPipeline, MirrorError, MirrorOutcome, NotificationHook, ReverseMirror};
use crate::store::ManifestStore;
use crate::watcher::{FileWatcher, WatchError, WatchGuard};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to watch {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: WatchError,
    },
}

pub struct AutoupdateEngine {
    settings: ResolvedSettings,
    store: Arc<ManifestStore>,
    forward: Arc<ForwardPipeline>,
    mirror: Option<ReverseMirror>,
    watcher: FileWatcher,
    guards: Vec<WatchGuard>,
}

impl AutoupdateEngine {
    pub fn new(settings: ResolvedSettings, hook: Arc<dyn NotificationHook>) -> Self {
        let watcher = match settings.watch_backend {
            WatchBackend::Poll => FileWatcher::polling(settings.poll_interval),
            WatchBackend::Notify => FileWatcher::native(),
        };
        Self::with_watcher(settings, hook, watcher)
    }

    /// Build an engine around a specific change source.
    pub fn with_watcher(settings: ResolvedSettings, hook: Arc<dyn NotificationHook>, watcher: FileWatcher) -> Self {
        let store = Arc::new(ManifestStore::new());
        let forward = Arc::new(ForwardPipeline::new(store.clone(), hook).with_dedup(settings.forward_dedup));
        let mirror = settings
            .emit_dir
            .as_deref()
            .map(|dir| ReverseMirror::new(dir, store.clone(), settings.development));

        Self {
            settings,
            store,
            forward,
            mirror,
            watcher,
            guards: Vec::new(),
        }
    }

    /// Install a watch on every configured path, eagerly loading the ones
    /// that exist. Eager loads run on the blocking pool; this resolves once
    /// each has reached the notification hook or been rejected.
    ///
    /// A path whose watch cannot be installed fails startup; earlier watches
    /// are stopped when the engine is dropped.
    pub async fn start(&mut self, shutdown: &Shutdown) -> Result<(), EngineError> {
        if self.settings.watched.is_empty() {
            tracing::info!("No autoupdate files being watched");
        } else {
            let watched: Vec<String> = self.settings.watched.iter().map(|p| p.display().to_string()).collect();
            tracing::info!(paths = ?watched, "Watching autoupdate files");
        }

        for path in &self.settings.watched {
            let guard = self
                .watcher
                .watch(path, self.forward.clone(), true, shutdown)
                .await
                .map_err(|source| EngineError::Watch { path: path.clone(), source })?;
            self.guards.push(guard);
        }
        metrics::record_watched_paths(self.guards.len());

        match &self.mirror {
            Some(mirror) if self.settings.development => {
                tracing::info!(path = %mirror.target().display(), "Mirroring runtime manifest to disk");
            }
            Some(mirror) => {
                tracing::info!(path = %mirror.target().display(), "Mirror configured but inactive outside development mode");
            }
            None => {}
        }
        Ok(())
    }

    /// Forward a host runtime-config change to the reverse mirror.
    ///
    /// Without a configured output directory this is a no-op.
    pub fn on_runtime_config_changed(&self, payload: &Value) -> Result<MirrorOutcome, MirrorError> {
        match &self.mirror {
            Some(mirror) => mirror.on_runtime_config_changed(payload),
            None => Ok(MirrorOutcome::Skipped),
        }
    }

    /// The manifest in effect for a watched path.
    pub fn current(&self, path: &Path) -> Option<Arc<ValidatedManifest>> {
        self.store.current(path)
    }

    pub fn store(&self) -> &Arc<ManifestStore> {
        &self.store
    }

    pub fn mirror(&self) -> Option<&ReverseMirror> {
        self.mirror.as_ref()
    }

    /// Number of watches currently installed.
    pub fn active_watches(&self) -> usize {
        self.guards.iter().filter(|g| !g.is_finished()).count()
    }

    /// Drop every watch.
    pub fn stop(&mut self) {
        self.guards.clear();
        metrics::record_watched_paths(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use serde_json::json;

    fn settings(watched: Vec<PathBuf>, emit_dir: Option<PathBuf>, development: bool) -> ResolvedSettings {
        ResolvedSettings {
            watched,
            emit_dir,
            development,
            poll_interval: Duration::from_secs(60),
            watch_backend: WatchBackend::Poll,
            forward_dedup: false,
        }
    }

    fn noop_hook() -> Arc<dyn NotificationHook> {
        Arc::new(|_: &str, _: &ValidatedManifest| {})
    }

    #[tokio::test]
    async fn test_inert_without_paths() {
        let mut engine = AutoupdateEngine::new(settings(Vec::new(), None, false), noop_hook());
        engine.start(&Shutdown::new()).await.unwrap();
        assert_eq!(engine.active_watches(), 0);
        assert!(engine.mirror().is_none());
        assert_eq!(
            engine.on_runtime_config_changed(&json!({})).unwrap(),
            MirrorOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_native_backend_requires_directory() {
        let mut s = settings(vec![PathBuf::from("/no/such/dir/autoupdate.json")], None, false);
        s.watch_backend = WatchBackend::Notify;
        let mut engine = AutoupdateEngine::new(s, noop_hook());
        let err = engine.start(&Shutdown::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Watch { source: WatchError::MissingDirectory(_), .. }));
    }

    #[tokio::test]
    async fn test_stop_clears_watches() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = AutoupdateEngine::new(
            settings(vec![dir.path().join("autoupdate.json")], Some(dir.path().join("out")), true),
            noop_hook(),
        );
        let shutdown = Shutdown::new();
        engine.start(&shutdown).await.unwrap();
        assert_eq!(engine.active_watches(), 1);
        assert_eq!(engine.mirror().unwrap().target(), dir.path().join("out").join("autoupdate.json"));

        engine.stop();
        assert_eq!(engine.active_watches(), 0);
    }

    #[tokio::test]
    async fn test_eager_load_hook_may_read_engine_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoupdate.json");
        std::fs::write(
            &path,
            json!({
                "appId": "app1",
                "versions": { "web.browser": {
                    "version": "v1", "versionRefreshable": "r",
                    "versionNonRefreshable": "n", "versionReplaceable": "p"
                }}
            })
            .to_string(),
        )
        .unwrap();

        let store: Arc<std::sync::OnceLock<Arc<ManifestStore>>> = Arc::default();
        let reads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let (hook_store, hook_path, r) = (store.clone(), path.clone(), reads.clone());
        let hook = move |_: &str, _: &ValidatedManifest| {
            if let Some(store) = hook_store.get() {
                let _ = store.state(&hook_path);
                r.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        };

        let mut engine = AutoupdateEngine::new(settings(vec![path.clone()], None, false), Arc::new(hook));
        let _ = store.set(engine.store().clone());
        let shutdown = Shutdown::new();
        tokio::time::timeout(Duration::from_secs(5), engine.start(&shutdown))
            .await
            .expect("eager load should not block on the store")
            .unwrap();

        assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(engine.current(&path).unwrap().app_id(), "app1");
    }
}
