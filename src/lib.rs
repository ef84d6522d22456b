//! Static-hosting autoupdate manifest engine.
//!
//! Keeps a running server informed of the current build manifest
//! (`autoupdate.json`) written by an external build pipeline, and in
//! development mode mirrors the server's live manifest back to disk.

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod manifest;
pub mod observability;
pub mod reconcile;
pub mod store;
pub mod watcher;

pub use config::Settings;
pub use engine::AutoupdateEngine;
pub use lifecycle::Shutdown;
pub use manifest::{validate, ValidatedManifest};
pub use reconcile::NotificationHook;
