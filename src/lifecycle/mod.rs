//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (engine.rs):
//!     Resolve settings → Build store and pipeline → Install watches (eager loads)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → every watch task leaves its loop
//!
//! Signals (signals.rs):
//!     SIGINT / Ctrl+C → trigger shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
