//! Environment precedence and path resolution.
//!
//! Environment variables win over the settings file:
//! - `AUTOUPDATE_MONITORS`: comma-separated base directories
//! - `AUTOUPDATE_EMITPATH`: reverse mirror output directory
//! - `AUTOUPDATE_POLL_INTERVAL_MS`: poll interval

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::schema::{Settings, WatchBackend};
use crate::manifest::MANIFEST_FILE_NAME;

pub const ENV_MONITORS: &str = "AUTOUPDATE_MONITORS";
pub const ENV_EMIT_PATH: &str = "AUTOUPDATE_EMITPATH";
pub const ENV_POLL_INTERVAL: &str = "AUTOUPDATE_POLL_INTERVAL_MS";

/// Read access to environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Settings with every source applied and every path resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    /// Absolute `<dir>/autoupdate.json` paths, deduplicated, in input order.
    pub watched: Vec<PathBuf>,
    /// Absolute mirror output directory.
    pub emit_dir: Option<PathBuf>,
    pub development: bool,
    pub poll_interval: Duration,
    pub watch_backend: WatchBackend,
    pub forward_dedup: bool,
}

impl ResolvedSettings {
    /// Resolve against the process environment.
    pub fn from_settings(settings: &Settings) -> Self {
        resolve(settings, &ProcessEnv)
    }
}

/// Apply environment precedence and resolve paths.
pub fn resolve(settings: &Settings, env: &dyn EnvSource) -> ResolvedSettings {
    let non_empty = |key: &str| env.var(key).filter(|v| !v.trim().is_empty());

    let monitors: Vec<String> = match non_empty(ENV_MONITORS) {
        Some(list) => list.split(',').map(str::to_string).collect(),
        None => settings.monitors.clone(),
    };

    let mut watched = Vec::new();
    for entry in &monitors {
        let entry = entry.trim();
        if entry.is_empty() {
            tracing::warn!("Ignoring blank monitor entry");
            continue;
        }
        let path = absolute(&Path::new(entry).join(MANIFEST_FILE_NAME));
        if !watched.contains(&path) {
            watched.push(path);
        }
    }

    let emit_dir = non_empty(ENV_EMIT_PATH)
        .or_else(|| settings.emit.clone())
        .map(|dir| dir.trim().to_string())
        .filter(|dir| !dir.is_empty())
        .map(|dir| absolute(Path::new(&dir)));

    let poll_interval_ms = match non_empty(ENV_POLL_INTERVAL) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => ms,
            _ => {
                tracing::warn!(value = %raw, "Invalid {ENV_POLL_INTERVAL}, using settings value");
                settings.poll_interval_ms
            }
        },
        None => settings.poll_interval_ms,
    };

    ResolvedSettings {
        watched,
        emit_dir,
        development: settings.development,
        poll_interval: Duration::from_millis(poll_interval_ms),
        watch_backend: settings.watch_backend,
        forward_dedup: settings.forward_dedup,
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
