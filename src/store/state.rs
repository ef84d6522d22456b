//! Per-path manifest state machine.
//!
//! ```text
//!            apply                 reject
//!  Unseen ─────────▶ Applied ◀──────────────▶ Rejected { last_good }
//!    │                 ▲   apply                  │
//!    └──── reject ─────┼──────────────────────────┘
//!                      └──── apply (from Rejected)
//! ```
//!
//! A rejection never discards the last applied manifest.

use std::sync::Arc;

use crate::manifest::ValidatedManifest;

/// Why the most recent attempt for a slot was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Parse,
    Invalid,
    Io,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::Parse => "parse",
            RejectReason::Invalid => "invalid",
            RejectReason::Io => "io",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum ManifestState {
    /// No valid or invalid manifest has been observed yet.
    #[default]
    Unseen,
    Applied(Arc<ValidatedManifest>),
    Rejected {
        last_good: Option<Arc<ValidatedManifest>>,
        reason: RejectReason,
    },
}

impl ManifestState {
    /// The manifest currently in effect.
    pub fn last_good(&self) -> Option<&Arc<ValidatedManifest>> {
        match self {
            ManifestState::Unseen => None,
            ManifestState::Applied(manifest) => Some(manifest),
            ManifestState::Rejected { last_good, .. } => last_good.as_ref(),
        }
    }

    /// Whether `candidate` is deep-equal to the manifest in effect.
    pub fn is_current(&self, candidate: &ValidatedManifest) -> bool {
        self.last_good().is_some_and(|current| **current == *candidate)
    }

    pub fn apply(&mut self, manifest: Arc<ValidatedManifest>) {
        *self = ManifestState::Applied(manifest);
    }

    pub fn reject(&mut self, reason: RejectReason) {
        let last_good = self.last_good().cloned();
        *self = ManifestState::Rejected { last_good, reason };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::validate;
    use serde_json::json;

    fn manifest(version: &str) -> Arc<ValidatedManifest> {
        let doc = json!({
            "appId": "app1",
            "versions": { "web.browser": {
                "version": version, "versionRefreshable": "r",
                "versionNonRefreshable": "n", "versionReplaceable": "p"
            }}
        });
        Arc::new(validate(&doc).unwrap())
    }

    #[test]
    fn test_unseen_to_rejected_has_no_last_good() {
        let mut state = ManifestState::default();
        state.reject(RejectReason::Parse);
        assert!(matches!(state, ManifestState::Rejected { last_good: None, reason: RejectReason::Parse }));
    }

    #[test]
    fn test_rejection_keeps_last_good() {
        let mut state = ManifestState::default();
        state.apply(manifest("v1"));
        state.reject(RejectReason::Invalid);
        assert_eq!(state.last_good().unwrap().versions.values().next().unwrap().version, "v1");

        state.reject(RejectReason::Parse);
        assert!(state.last_good().is_some());

        state.apply(manifest("v2"));
        assert!(matches!(state, ManifestState::Applied(_)));
        assert!(state.is_current(&manifest("v2")));
        assert!(!state.is_current(&manifest("v1")));
    }
}
