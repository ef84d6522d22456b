//! Settings schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML settings
//! file. Every field has a default so an empty file is a valid (inert) setup.

use serde::{Deserialize, Serialize};

/// Root settings for the autoupdate subsystem.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Base directories whose `autoupdate.json` is watched.
    pub monitors: Vec<String>,

    /// Output directory for the reverse mirror.
    pub emit: Option<String>,

    /// Whether the host runs a live development build.
    pub development: bool,

    /// Interval between metadata polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Change detection primitive.
    pub watch_backend: WatchBackend,

    /// Skip forwarding manifests equal to the one already applied.
    pub forward_dedup: bool,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitors: Vec::new(),
            emit: None,
            development: false,
            poll_interval_ms: 2000,
            watch_backend: WatchBackend::Poll,
            forward_dedup: false,
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatchBackend {
    /// Periodic metadata polling. Works on network and bind mounts.
    #[default]
    Poll,
    /// OS change notifications.
    Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
