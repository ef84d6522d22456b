//! Metrics collection and exposition.
//!
//! # Metrics
//! - `autoupdate_manifests_applied_total` (counter): forwarded manifests by `app_id`
//! - `autoupdate_manifests_rejected_total` (counter): rejected updates by `reason`
//! - `autoupdate_manifests_unchanged_total` (counter): updates suppressed by forward dedup
//! - `autoupdate_mirror_total` (counter): mirror attempts by `outcome`
//! - `autoupdate_watched_paths` (gauge): number of installed watches

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_manifest_applied(app_id: &str) {
    metrics::counter!("autoupdate_manifests_applied_total", "app_id" => app_id.to_string()).increment(1);
}

pub fn record_manifest_rejected(reason: &'static str) {
    metrics::counter!("autoupdate_manifests_rejected_total", "reason" => reason).increment(1);
}

pub fn record_manifest_unchanged() {
    metrics::counter!("autoupdate_manifests_unchanged_total").increment(1);
}

pub fn record_mirror(outcome: &'static str) {
    metrics::counter!("autoupdate_mirror_total", "outcome" => outcome).increment(1);
}

pub fn record_watched_paths(count: usize) {
    metrics::gauge!("autoupdate_watched_paths").set(count as f64);
}
