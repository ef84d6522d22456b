//! Manifest store.
//!
//! # Data Flow
//! ```text
//! forward pipeline ──▶ forward slot (per watched path) ── ManifestState
//! reverse mirror   ──▶ mirror slot  (per mirror target) ── last written Value
//! ```
//!
//! # Design Decisions
//! - One slot per resolved path, created on first use
//! - A forward slot serializes attempts with its own mutex, but publishes the
//!   resulting state through an `ArcSwap` so readers never take that mutex;
//!   a notification hook may read the store for the path it is notified about
//! - A poisoned slot lock is recovered: state is only published after the
//!   hook returns, so a panicking hook leaves the previous state in place
//! - The store is owned by the engine and shared via `Arc`, never global

pub mod state;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde_json::Value;

use crate::manifest::ValidatedManifest;

pub use state::{ManifestState, RejectReason};

/// Last mirrored document for a target, `None` until something is written.
pub type MirrorSlot = Option<Value>;

/// Lock a slot mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock_slot<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Forward state for one watched path.
pub struct ForwardSlot {
    attempt: Mutex<()>,
    published: ArcSwap<ManifestState>,
}

impl Default for ForwardSlot {
    fn default() -> Self {
        Self {
            attempt: Mutex::new(()),
            published: ArcSwap::from_pointee(ManifestState::Unseen),
        }
    }
}

impl ForwardSlot {
    /// Start a reconciliation attempt. Attempts on the same slot never overlap.
    pub fn begin(&self) -> ForwardAttempt<'_> {
        ForwardAttempt {
            _guard: lock_slot(&self.attempt),
            slot: self,
        }
    }

    /// The last published state. Never blocks on a running attempt.
    pub fn snapshot(&self) -> Arc<ManifestState> {
        self.published.load_full()
    }
}

/// Exclusive access to a forward slot for the duration of one attempt.
pub struct ForwardAttempt<'a> {
    _guard: MutexGuard<'a, ()>,
    slot: &'a ForwardSlot,
}

impl ForwardAttempt<'_> {
    pub fn state(&self) -> Arc<ManifestState> {
        self.slot.snapshot()
    }

    pub fn publish(&self, state: ManifestState) {
        self.slot.published.store(Arc::new(state));
    }
}

#[derive(Default)]
pub struct ManifestStore {
    forward: DashMap<PathBuf, Arc<ForwardSlot>>,
    mirror: DashMap<PathBuf, Arc<Mutex<MirrorSlot>>>,
}

impl ManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The forward slot for a watched path.
    pub fn forward_slot(&self, path: &Path) -> Arc<ForwardSlot> {
        self.forward.entry(path.to_path_buf()).or_default().clone()
    }

    /// The mirror slot for a mirror target.
    pub fn mirror_slot(&self, path: &Path) -> Arc<Mutex<MirrorSlot>> {
        self.mirror.entry(path.to_path_buf()).or_default().clone()
    }

    /// The manifest currently in effect for a watched path.
    pub fn current(&self, path: &Path) -> Option<Arc<ValidatedManifest>> {
        let slot = self.forward.get(path)?.clone();
        let state = slot.snapshot();
        state.last_good().cloned()
    }

    /// A snapshot of the state for a watched path.
    pub fn state(&self, path: &Path) -> ManifestState {
        match self.forward.get(path).map(|slot| slot.clone()) {
            Some(slot) => (*slot.snapshot()).clone(),
            None => ManifestState::Unseen,
        }
    }

    /// The last document mirrored to `path`.
    pub fn last_mirrored(&self, path: &Path) -> Option<Value> {
        let slot = self.mirror.get(path)?.clone();
        let cached = lock_slot(&slot);
        cached.clone()
    }

    pub fn watched_slots(&self) -> usize {
        self.forward.len()
    }
}
