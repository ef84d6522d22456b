//! Settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → sources.rs (environment precedence, path resolution)
//!     → ResolvedSettings (absolute manifest paths, intervals)
//!     → engine
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; with nothing configured the engine is inert
//! - Environment variables win over the settings file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod sources;
pub mod validation;

pub use loader::{load_settings, ConfigError};
pub use schema::{LogFormat, ObservabilityConfig, Settings, WatchBackend};
pub use sources::{resolve, EnvSource, ProcessEnv, ResolvedSettings};
