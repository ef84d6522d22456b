//! Build manifest model and schema validation.
//!
//! # Data Flow
//! ```text
//! autoupdate.json (raw JSON text)
//!     → serde_json::Value (parsed, untrusted)
//!     → validate.rs (envelope → allow-list → per-entry records)
//!     → ValidatedManifest (typed, trusted)
//!     → notification hook / manifest store
//! ```
//!
//! # Design Decisions
//! - Validation works on `serde_json::Value` so every field error is reported,
//!   not just the first one serde would trip over
//! - Architecture keys are an enum with a single allow-list constant shared by
//!   the key-difference check and the per-entry loop
//! - `ValidatedManifest` can only be built by the validator

pub mod types;
pub mod validate;

pub use types::{Architecture, Asset, ManifestDocument, ValidatedManifest, VersionEntry};
pub use validate::{validate, FieldError, ManifestError, Problem};

/// File name resolved inside every watched or mirrored directory.
pub const MANIFEST_FILE_NAME: &str = "autoupdate.json";
