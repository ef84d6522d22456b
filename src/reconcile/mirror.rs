//! Reverse mirror: live runtime configuration → manifest file on disk.
//!
//! Only active in development mode with an output directory configured.
//! Writing the file normally makes the host restart, so every path that can
//! end without a write is taken whenever the disk already has the document.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::manifest::{validate, Architecture, MANIFEST_FILE_NAME};
use crate::observability::metrics;
use crate::store::{lock_slot, ManifestStore};

/// Fields that are restart-scoped and never belong in a static manifest.
pub const DEV_ONLY_FIELDS: [&str; 1] = ["versionHmr"];

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The existing target could not be read for a reason other than absence.
    #[error("failed to read mirror target {}: {source}", .path.display())]
    ReadTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write mirror target {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Not running in development mode.
    Skipped,
    /// The payload carried no `runtimeConfig.autoupdate`.
    NoManifest,
    /// `versions` was absent or empty.
    EmptyVersions,
    /// Equal to the last document this mirror handled.
    Cached,
    /// Equal to what is already on disk.
    OnDisk,
    Written,
}

impl MirrorOutcome {
    fn as_str(self) -> &'static str {
        match self {
            MirrorOutcome::Skipped => "skipped",
            MirrorOutcome::NoManifest | MirrorOutcome::EmptyVersions => "empty",
            MirrorOutcome::Cached => "cached",
            MirrorOutcome::OnDisk => "on_disk",
            MirrorOutcome::Written => "written",
        }
    }
}

pub struct ReverseMirror {
    target: PathBuf,
    store: Arc<ManifestStore>,
    development: bool,
}

impl ReverseMirror {
    /// Mirror into `<output_dir>/autoupdate.json`.
    pub fn new(output_dir: &Path, store: Arc<ManifestStore>, development: bool) -> Self {
        Self {
            target: output_dir.join(MANIFEST_FILE_NAME),
            store,
            development,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Handle a host runtime-config change of the form
    /// `{ "runtimeConfig": { "autoupdate": { ... } } }`.
    pub fn on_runtime_config_changed(&self, payload: &Value) -> Result<MirrorOutcome, MirrorError> {
        if !self.development {
            return Ok(self.finish(MirrorOutcome::Skipped));
        }
        match payload.pointer("/runtimeConfig/autoupdate") {
            Some(candidate) => self.mirror(candidate),
            None => Ok(self.finish(MirrorOutcome::NoManifest)),
        }
    }

    /// Mirror one candidate manifest.
    pub fn mirror(&self, candidate: &Value) -> Result<MirrorOutcome, MirrorError> {
        if !self.development {
            return Ok(self.finish(MirrorOutcome::Skipped));
        }

        // Own copy; the host keeps mutating its live config.
        let mut document = candidate.clone();
        let has_versions = document
            .get("versions")
            .and_then(Value::as_object)
            .is_some_and(|versions| !versions.is_empty());
        if !has_versions {
            return Ok(self.finish(MirrorOutcome::EmptyVersions));
        }
        strip_dev_only_fields(&mut document);

        let slot = self.store.mirror_slot(&self.target);
        let mut cached = lock_slot(&slot);
        if cached.as_ref() == Some(&document) {
            return Ok(self.finish(MirrorOutcome::Cached));
        }

        let previous = cached.replace(document.clone());
        match self.sync_to_disk(&document) {
            Ok(outcome) => Ok(self.finish(outcome)),
            Err(e) => {
                *cached = previous;
                Err(e)
            }
        }
    }

    fn sync_to_disk(&self, document: &Value) -> Result<MirrorOutcome, MirrorError> {
        match std::fs::read_to_string(&self.target) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(on_disk) if on_disk == *document => return Ok(MirrorOutcome::OnDisk),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %self.target.display(), error = %e, "Mirror target is not valid JSON, replacing it");
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.target.display(), "Creating mirror target");
            }
            Err(source) => {
                return Err(MirrorError::ReadTarget { path: self.target.clone(), source });
            }
        }

        if let Err(e) = validate(document) {
            tracing::warn!(path = %self.target.display(), error = %e, "Mirrored manifest will be rejected by watchers");
        }

        tracing::info!(path = %self.target.display(), app_id = ?document.get("appId"), "Updating mirror target");
        write_atomic(&self.target, document)?;
        Ok(MirrorOutcome::Written)
    }

    fn finish(&self, outcome: MirrorOutcome) -> MirrorOutcome {
        tracing::debug!(path = %self.target.display(), outcome = ?outcome, "Mirror attempt finished");
        metrics::record_mirror(outcome.as_str());
        outcome
    }
}

/// Remove development-only markers from every architecture entry.
pub fn strip_dev_only_fields(document: &mut Value) {
    let Some(versions) = document.get_mut("versions").and_then(Value::as_object_mut) else {
        return;
    };
    for arch in Architecture::ALL {
        if let Some(entry) = versions.get_mut(arch.key()).and_then(Value::as_object_mut) {
            for field in DEV_ONLY_FIELDS {
                entry.remove(field);
            }
        }
    }
}

/// Replace `target` with `document` via a sibling temporary file and rename.
fn write_atomic(target: &Path, document: &Value) -> Result<(), MirrorError> {
    let write_err = |source: io::Error| MirrorError::Write { path: target.to_path_buf(), source };

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let bytes = serde_json::to_vec(document)?;
    let staging = target.with_extension("json.tmp");
    std::fs::write(&staging, bytes).map_err(write_err)?;
    std::fs::rename(&staging, target).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(version: &str, hmr: u64) -> Value {
        json!({
            "appId": "app1",
            "versions": {
                "web.browser": {
                    "version": version, "versionRefreshable": "r",
                    "versionNonRefreshable": "n", "versionReplaceable": "p",
                    "versionHmr": hmr
                },
                "web.cordova": {
                    "version": version, "versionRefreshable": "r",
                    "versionNonRefreshable": "n", "versionReplaceable": "p"
                }
            }
        })
    }

    fn mirror_in(dir: &Path) -> ReverseMirror {
        ReverseMirror::new(dir, Arc::new(ManifestStore::new()), true)
    }

    fn read(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_strip_dev_only_fields() {
        let mut doc = candidate("v1", 3);
        strip_dev_only_fields(&mut doc);
        assert!(doc["versions"]["web.browser"].get("versionHmr").is_none());
        assert_eq!(doc["versions"]["web.browser"]["version"], "v1");
    }

    #[test]
    fn test_first_candidate_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let mirror = mirror_in(&out);

        assert_eq!(mirror.mirror(&candidate("v1", 1)).unwrap(), MirrorOutcome::Written);

        let written = read(mirror.target());
        assert_eq!(written["appId"], "app1");
        assert!(written["versions"]["web.browser"].get("versionHmr").is_none());
        assert!(!mirror.target().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_hmr_only_change_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = mirror_in(dir.path());

        assert_eq!(mirror.mirror(&candidate("v1", 1)).unwrap(), MirrorOutcome::Written);
        assert_eq!(mirror.mirror(&candidate("v1", 2)).unwrap(), MirrorOutcome::Cached);
        assert_eq!(mirror.mirror(&candidate("v2", 2)).unwrap(), MirrorOutcome::Written);
        assert_eq!(read(mirror.target())["versions"]["web.cordova"]["version"], "v2");
    }

    #[test]
    fn test_cold_cache_matching_disk_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut on_disk = candidate("v1", 0);
        strip_dev_only_fields(&mut on_disk);
        // pretty-printed, same value
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), serde_json::to_string_pretty(&on_disk).unwrap()).unwrap();
        let before = std::fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).unwrap();

        let mirror = mirror_in(dir.path());
        assert_eq!(mirror.mirror(&candidate("v1", 9)).unwrap(), MirrorOutcome::OnDisk);

        let after = std::fs::read_to_string(mirror.target()).unwrap();
        assert_eq!(before, after);
        assert_eq!(mirror.store.last_mirrored(mirror.target()), Some(on_disk));
    }

    #[test]
    fn test_empty_versions_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = mirror_in(dir.path());

        assert_eq!(mirror.mirror(&json!({ "appId": "app1", "versions": {} })).unwrap(), MirrorOutcome::EmptyVersions);
        assert_eq!(mirror.mirror(&json!({ "appId": "app1" })).unwrap(), MirrorOutcome::EmptyVersions);
        assert!(!mirror.target().exists());
    }

    #[test]
    fn test_production_mode_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = ReverseMirror::new(dir.path(), Arc::new(ManifestStore::new()), false);
        let payload = json!({ "runtimeConfig": { "autoupdate": candidate("v1", 1) } });

        assert_eq!(mirror.on_runtime_config_changed(&payload).unwrap(), MirrorOutcome::Skipped);
        assert!(!mirror.target().exists());
    }

    #[test]
    fn test_runtime_config_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = mirror_in(dir.path());

        assert_eq!(mirror.on_runtime_config_changed(&json!({ "runtimeConfig": {} })).unwrap(), MirrorOutcome::NoManifest);
        let payload = json!({ "runtimeConfig": { "autoupdate": candidate("v1", 1) } });
        assert_eq!(mirror.on_runtime_config_changed(&payload).unwrap(), MirrorOutcome::Written);
    }

    #[test]
    fn test_concurrent_identical_candidates_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = mirror_in(dir.path());

        let outcomes: Vec<MirrorOutcome> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8u64)
                .map(|hmr| {
                    let mirror = &mirror;
                    scope.spawn(move || mirror.mirror(&candidate("v1", hmr)).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let written = outcomes.iter().filter(|o| **o == MirrorOutcome::Written).count();
        let deduped = outcomes
            .iter()
            .filter(|o| matches!(o, MirrorOutcome::Cached | MirrorOutcome::OnDisk))
            .count();
        assert_eq!(written, 1);
        assert_eq!(deduped, 7);
        assert_eq!(read(mirror.target())["versions"]["web.browser"]["version"], "v1");
    }

    #[test]
    fn test_corrupt_target_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), "{ half written").unwrap();

        let mirror = mirror_in(dir.path());
        assert_eq!(mirror.mirror(&candidate("v1", 1)).unwrap(), MirrorOutcome::Written);
        assert_eq!(read(mirror.target())["appId"], "app1");
    }

    #[test]
    fn test_unreadable_target_is_fatal_and_rolls_back_cache() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be cannot be read as a string
        std::fs::create_dir_all(dir.path().join(MANIFEST_FILE_NAME)).unwrap();

        let mirror = mirror_in(dir.path());
        let err = mirror.mirror(&candidate("v1", 1)).unwrap_err();
        assert!(matches!(err, MirrorError::ReadTarget { .. }));
        assert!(mirror.store.last_mirrored(mirror.target()).is_none());
    }
}
