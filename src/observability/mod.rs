//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! watcher / forward pipeline / reverse mirror produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional, host binary)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`path`, `app_id`, `version`) on every manifest event
//! - Metrics go through the `metrics` facade; without an installed recorder
//!   they are no-ops, so library users pay nothing

pub mod logging;
pub mod metrics;
