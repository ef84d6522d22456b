//! Reference host for the autoupdate engine.
//!
//! Stands in for the web server that normally embeds the engine:
//!
//! ```text
//!   settings.toml + env ──▶ ResolvedSettings ──▶ AutoupdateEngine
//!                                                   │        ▲
//!   autoupdate.json (watched) ──── poll ────────────┘        │
//!                                                            │
//!   stdin (NDJSON runtime-config payloads, dev mode) ────────┘ ──▶ <emit>/autoupdate.json
//!
//!   BroadcastHook ──▶ subscribers ("connected clients", logged here)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use autoupdate_static::config::{load_settings, ResolvedSettings, Settings};
use autoupdate_static::lifecycle::{signals, Shutdown};
use autoupdate_static::observability::{logging, metrics};
use autoupdate_static::reconcile::BroadcastHook;
use autoupdate_static::AutoupdateEngine;

#[derive(Parser)]
#[command(name = "autoupdate-static")]
#[command(about = "Watches static build manifests and notifies connected clients", long_about = None)]
struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Run as a development host: mirror runtime-config payloads read from stdin.
    #[arg(long)]
    development: bool,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    settings.development |= cli.development;
    if let Some(level) = cli.log_level {
        settings.observability.log_level = level;
    }

    logging::init_logging(&settings.observability.log_level, settings.observability.log_format)?;
    tracing::info!("autoupdate-static v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let resolved = ResolvedSettings::from_settings(&settings);
    tracing::info!(
        watched = resolved.watched.len(),
        emit = ?resolved.emit_dir,
        development = resolved.development,
        poll_interval = ?resolved.poll_interval,
        "Settings resolved"
    );

    let hook = BroadcastHook::new(64);
    let mut clients = hook.subscribe();
    tokio::spawn(async move {
        loop {
            match clients.recv().await {
                Ok(update) => {
                    let version = update.manifest.primary().map(|(_, e)| e.version.clone());
                    tracing::info!(app_id = %update.app_id, version = ?version, "Clients told to refresh");
                }
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "Client fan-out lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let shutdown = Shutdown::new();
    let mut engine = AutoupdateEngine::new(resolved, Arc::new(hook));
    engine.start(&shutdown).await?;

    let mut stop = shutdown.subscribe();
    let signal = tokio::spawn(signals::shutdown_on_ctrl_c(shutdown.clone()));

    let mut stopped = false;
    if settings.development && engine.mirror().is_some() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<serde_json::Value>(&line) {
                        // Fatal mirror errors end the host.
                        Ok(payload) => { engine.on_runtime_config_changed(&payload)?; }
                        Err(e) => tracing::warn!(error = %e, "Ignoring malformed runtime-config payload"),
                    }
                }
                _ = stop.recv() => {
                    stopped = true;
                    break;
                }
            }
        }
    }

    if !stopped {
        let _ = stop.recv().await;
    }
    signal.await??;

    engine.stop();
    tracing::info!("Shutdown complete");
    Ok(())
}
