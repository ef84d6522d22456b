//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autoupdate_static::config::{ResolvedSettings, WatchBackend};
use autoupdate_static::{NotificationHook, ValidatedManifest};
use serde_json::{json, Value};

/// A notification hook that records every call.
#[derive(Clone, Default)]
pub struct RecordingHook {
    calls: Arc<Mutex<Vec<(String, ValidatedManifest)>>>,
}

impl RecordingHook {
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn versions(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.primary().map(|(_, e)| e.version.clone()).unwrap_or_default())
            .collect()
    }

    pub fn last(&self) -> Option<(String, ValidatedManifest)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl NotificationHook for RecordingHook {
    fn notify(&self, app_id: &str, manifest: &ValidatedManifest) {
        self.calls.lock().unwrap().push((app_id.to_string(), manifest.clone()));
    }
}

pub fn manifest(version: &str) -> Value {
    json!({
        "appId": "app1",
        "versions": {
            "web.browser": {
                "version": version,
                "versionRefreshable": format!("{version}-r"),
                "versionNonRefreshable": format!("{version}-n"),
                "versionReplaceable": format!("{version}-p"),
                "assets": [{ "url": "/app.js" }]
            }
        }
    })
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
}

pub fn settings(watched: Vec<PathBuf>, poll: Duration) -> ResolvedSettings {
    ResolvedSettings {
        watched,
        emit_dir: None,
        development: false,
        poll_interval: poll,
        watch_backend: WatchBackend::Poll,
        forward_dedup: false,
    }
}

/// Poll `check` until it holds or the deadline passes.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..300 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
