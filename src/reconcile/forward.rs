//! Forward reconciliation: watched manifest file → notification hook.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::manifest::{validate, ManifestError, ValidatedManifest};
use crate::observability::metrics;
use crate::reconcile::hook::NotificationHook;
use crate::store::{ManifestStore, RejectReason};
use crate::watcher::{FileEventHandler, Trigger};

/// Why an update was not forwarded.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The file disappeared between change detection and the read.
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} did not pass schema validation: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },
}

impl ForwardError {
    fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            ForwardError::NotFound(_) => None,
            ForwardError::Io { .. } => Some(RejectReason::Io),
            ForwardError::Parse { .. } => Some(RejectReason::Parse),
            ForwardError::Invalid { .. } => Some(RejectReason::Invalid),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutcome {
    /// The manifest was handed to the notification hook.
    Applied(Arc<ValidatedManifest>),
    /// Forward dedup suppressed a manifest equal to the one in effect.
    Unchanged,
}

/// Reads, validates and forwards manifests for watched paths.
pub struct ForwardPipeline {
    store: Arc<ManifestStore>,
    hook: Arc<dyn NotificationHook>,
    dedup: bool,
}

impl ForwardPipeline {
    pub fn new(store: Arc<ManifestStore>, hook: Arc<dyn NotificationHook>) -> Self {
        Self { store, hook, dedup: false }
    }

    /// Suppress manifests deep-equal to the one already in effect.
    /// Initial loads are always forwarded.
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// Run one reconciliation attempt for `path`.
    ///
    /// Attempts on the same path are serialized, including the hook call.
    /// The resulting state is published only after the hook returns, and
    /// readers of the store never wait on a running attempt.
    pub fn reconcile(&self, path: &Path, trigger: Trigger) -> Result<ForwardOutcome, ForwardError> {
        let slot = self.store.forward_slot(path);
        let attempt = slot.begin();
        let mut state = (*attempt.state()).clone();

        let manifest = match read_manifest(path) {
            Ok(manifest) => manifest,
            Err(e) => {
                if let Some(reason) = e.reject_reason() {
                    state.reject(reason);
                    attempt.publish(state);
                    metrics::record_manifest_rejected(reason.as_str());
                }
                return Err(e);
            }
        };

        if self.dedup && trigger == Trigger::Changed && state.is_current(&manifest) {
            tracing::debug!(path = %path.display(), app_id = manifest.app_id(), "Manifest unchanged, not forwarding");
            metrics::record_manifest_unchanged();
            return Ok(ForwardOutcome::Unchanged);
        }

        let primary = manifest.primary().map(|(_, entry)| entry.version.as_str()).unwrap_or("-");
        tracing::info!(path = %path.display(), app_id = manifest.app_id(), version = primary, "Manifest accepted");

        let manifest = Arc::new(manifest);
        self.hook.notify(manifest.app_id(), &manifest);
        state.apply(manifest.clone());
        attempt.publish(state);
        metrics::record_manifest_applied(manifest.app_id());

        Ok(ForwardOutcome::Applied(manifest))
    }

    pub fn store(&self) -> &Arc<ManifestStore> {
        &self.store
    }
}

impl FileEventHandler for ForwardPipeline {
    fn on_file_event(&self, path: &Path, trigger: Trigger) {
        match self.reconcile(path, trigger) {
            Ok(_) => {}
            Err(ForwardError::NotFound(p)) => {
                tracing::info!(path = %p.display(), "Manifest not found, keeping current manifest");
            }
            Err(ForwardError::Invalid { path, source }) => {
                let errors: Vec<String> = source.field_errors().iter().map(|e| e.to_string()).collect();
                tracing::error!(
                    path = %path.display(),
                    error = %source,
                    errors = ?errors,
                    "Manifest did not pass schema validation, ignoring"
                );
            }
            Err(e) => tracing::error!(error = %e, "Manifest update ignored"),
        }
    }
}

/// Read, parse and validate one manifest file.
pub fn read_manifest(path: &Path) -> Result<ValidatedManifest, ForwardError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ForwardError::NotFound(path.to_path_buf())
        } else {
            ForwardError::Io { path: path.to_path_buf(), source }
        }
    })?;

    let parsed: serde_json::Value = serde_json::from_str(&content)
        .map_err(|source| ForwardError::Parse { path: path.to_path_buf(), source })?;

    validate(&parsed).map_err(|source| ForwardError::Invalid { path: path.to_path_buf(), source })
}
