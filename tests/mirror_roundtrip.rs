//! Tests for the server → disk direction and its meeting point with the watcher.

use std::sync::Arc;
use std::time::Duration;

use autoupdate_static::config::ResolvedSettings;
use autoupdate_static::reconcile::MirrorOutcome;
use autoupdate_static::{AutoupdateEngine, Shutdown};
use serde_json::{json, Value};

mod common;
use common::{eventually, manifest, settings, RecordingHook};

fn runtime_config(autoupdate: Value) -> Value {
    json!({ "runtimeConfig": { "autoupdate": autoupdate } })
}

fn dev_candidate(version: &str, hmr: u64) -> Value {
    let mut candidate = manifest(version);
    candidate["versions"]["web.browser"]["versionHmr"] = json!(hmr);
    candidate
}

fn mirror_settings(dir: &std::path::Path, watch: bool) -> ResolvedSettings {
    let target = dir.join("autoupdate.json");
    let mut s = settings(if watch { vec![target] } else { Vec::new() }, Duration::from_millis(25));
    s.emit_dir = Some(dir.to_path_buf());
    s.development = true;
    s
}

fn modified(path: &std::path::Path) -> std::time::SystemTime {
    std::fs::metadata(path).unwrap().modified().unwrap()
}

#[tokio::test]
async fn test_repeated_candidates_write_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = AutoupdateEngine::new(mirror_settings(dir.path(), false), Arc::new(RecordingHook::default()));

    let first = engine.on_runtime_config_changed(&runtime_config(dev_candidate("v1", 1))).unwrap();
    let stamp = modified(&dir.path().join("autoupdate.json"));
    let second = engine.on_runtime_config_changed(&runtime_config(dev_candidate("v1", 2))).unwrap();

    assert_eq!(first, MirrorOutcome::Written);
    assert_eq!(second, MirrorOutcome::Cached);
    assert_eq!(modified(&dir.path().join("autoupdate.json")), stamp);
}

#[tokio::test]
async fn test_restart_with_matching_disk_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = AutoupdateEngine::new(mirror_settings(dir.path(), false), Arc::new(RecordingHook::default()));
        engine.on_runtime_config_changed(&runtime_config(dev_candidate("v1", 1))).unwrap();
    }
    let stamp = modified(&dir.path().join("autoupdate.json"));

    // a fresh engine has a cold cache
    let engine = AutoupdateEngine::new(mirror_settings(dir.path(), false), Arc::new(RecordingHook::default()));
    let outcome = engine.on_runtime_config_changed(&runtime_config(dev_candidate("v1", 7))).unwrap();

    assert_eq!(outcome, MirrorOutcome::OnDisk);
    assert_eq!(modified(&dir.path().join("autoupdate.json")), stamp);
}

#[tokio::test]
async fn test_mirrored_manifest_round_trips_through_watcher() {
    let dir = tempfile::tempdir().unwrap();
    let hook = RecordingHook::default();
    let mut engine = AutoupdateEngine::new(mirror_settings(dir.path(), true), Arc::new(hook.clone()));
    let shutdown = Shutdown::new();
    engine.start(&shutdown).await.unwrap();
    assert_eq!(hook.count(), 0);

    let candidate = dev_candidate("v1", 4);
    let outcome = engine.on_runtime_config_changed(&runtime_config(candidate)).unwrap();
    assert_eq!(outcome, MirrorOutcome::Written);

    assert!(eventually(|| hook.count() == 1).await, "watcher should pick up the mirrored file");
    let (app_id, delivered) = hook.last().unwrap();
    assert_eq!(app_id, "app1");
    assert_eq!(delivered.to_value(), manifest("v1"));

    // same build again: no write, so nothing new for the watcher
    engine.on_runtime_config_changed(&runtime_config(dev_candidate("v1", 5))).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(hook.count(), 1);
}

#[tokio::test]
async fn test_production_host_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = mirror_settings(dir.path(), false);
    s.development = false;
    let engine = AutoupdateEngine::new(s, Arc::new(RecordingHook::default()));

    let outcome = engine.on_runtime_config_changed(&runtime_config(dev_candidate("v1", 1))).unwrap();
    assert_eq!(outcome, MirrorOutcome::Skipped);
    assert!(!dir.path().join("autoupdate.json").exists());
}
