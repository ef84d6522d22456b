//! Manifest reconciliation.
//!
//! # Data Flow
//! ```text
//! Forward (disk → server), forward.rs:
//!     watched file → read → parse → validate → [dedup] → NotificationHook → store
//!
//! Reverse (server → disk), mirror.rs:
//!     runtime config change → copy → strip dev-only fields
//!         → cache dedup → disk dedup → atomic write
//! ```
//!
//! # Design Decisions
//! - The two directions never call each other; they meet only at the manifest
//!   file, so both sides dedup before acting
//! - Forward failures are logged and dropped, the last good manifest stays in effect
//! - A reverse failure to read the existing target is fatal and propagated

pub mod forward;
pub mod hook;
pub mod mirror;

pub use forward::{ForwardError, ForwardOutcome, ForwardPipeline};
pub use hook::{BroadcastHook, ManifestUpdate, NotificationHook};
pub use mirror::{MirrorError, MirrorOutcome, ReverseMirror, DEV_ONLY_FIELDS};
