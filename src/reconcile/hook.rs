//! Notification hook seam.
//!
//! The hook receives every manifest the forward pipeline accepts. Panics
//! raised inside a hook are not caught by the pipeline.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::manifest::ValidatedManifest;

pub trait NotificationHook: Send + Sync {
    fn notify(&self, app_id: &str, manifest: &ValidatedManifest);
}

impl<F> NotificationHook for F
where
    F: Fn(&str, &ValidatedManifest) + Send + Sync,
{
    fn notify(&self, app_id: &str, manifest: &ValidatedManifest) {
        self(app_id, manifest)
    }
}

/// A manifest fanned out to subscribers.
#[derive(Debug, Clone)]
pub struct ManifestUpdate {
    pub app_id: String,
    pub manifest: Arc<ValidatedManifest>,
}

/// Fans manifests out to any number of subscribers (e.g. connected clients).
#[derive(Clone)]
pub struct BroadcastHook {
    tx: broadcast::Sender<ManifestUpdate>,
}

impl BroadcastHook {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ManifestUpdate> {
        self.tx.subscribe()
    }
}

impl NotificationHook for BroadcastHook {
    fn notify(&self, app_id: &str, manifest: &ValidatedManifest) {
        let update = ManifestUpdate {
            app_id: app_id.to_string(),
            manifest: Arc::new(manifest.clone()),
        };
        match self.tx.send(update) {
            Ok(receivers) => tracing::debug!(app_id, receivers, "Manifest broadcast"),
            Err(_) => tracing::debug!(app_id, "No subscribers for manifest update"),
        }
    }
}
