//! Prometheus metrics.
//!
//! - [`MetricsConfig`]: whether metrics are collected and where they are served
//! - [`init_metrics`]: install the Prometheus recorder
//! - [`metrics_handler`]: axum handler for the `/metrics` endpoint
//! - lookup helpers recording per-request business metrics
//!
//! # Example
//!
//! ```no_run
//! use gwlocate_service_shared::metrics::{init_metrics, metrics_handler, MetricsConfig};
//! use axum::{routing::get, Router};
//!
//! let config = MetricsConfig::from_env();
//! let mut app: Router = Router::new();
//! if config.enabled {
//!     if let Err(e) = init_metrics(&config) {
//!         eprintln!("metrics unavailable: {}", e);
//!     }
//!     app = app.route(&config.path, get(metrics_handler));
//! }
//! ```

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Path for the metrics endpoint.
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsConfig {
    /// - `METRICS_ENABLED`: "false" disables collection (default: enabled)
    /// - `METRICS_PATH`: endpoint path, rooted with a leading `/` when missing
    ///   (default: "/metrics")
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);
        let path = std::env::var("METRICS_PATH")
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(|p| if p.starts_with('/') { p } else { format!("/{}", p) })
            .unwrap_or_else(|| "/metrics".to_string());

        Self { enabled, path }
    }
}

/// Install the Prometheus recorder. Only the first successful call wins.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }
    if PROMETHEUS_HANDLE.get().is_some() {
        return Err(MetricsError::AlreadyInitialized);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)
}

/// Prometheus exposition text, or a comment line when no recorder is installed.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

#[derive(Debug, Clone)]
pub enum MetricsError {
    Disabled,
    AlreadyInitialized,
    InstallFailed(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::Disabled => write!(f, "metrics are disabled"),
            MetricsError::AlreadyInitialized => write!(f, "metrics recorder already initialized"),
            MetricsError::InstallFailed(e) => {
                write!(f, "failed to install metrics recorder: {}", e)
            }
        }
    }
}

impl std::error::Error for MetricsError {}

// =============================================================================
// Lookup metrics
// =============================================================================

/// Increment `gwlocate_lookups_total`.
///
/// `country` is the ISO code of the requester (empty when unknown), `endpoint`
/// is "json" or "text".
pub fn record_lookup(country: &str, endpoint: &str) {
    let country = if country.is_empty() { "unknown" } else { country };
    metrics::counter!(
        "gwlocate_lookups_total",
        "country" => country.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

/// Increment `gwlocate_lookups_failed_total`.
///
/// `reason` is one of "invalid_address", "address_not_found" or "internal".
pub fn record_lookup_failed(reason: &str) {
    metrics::counter!(
        "gwlocate_lookups_failed_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record the length of a ranking in the `gwlocate_gateways_ranked` histogram.
pub fn record_gateways_ranked(count: usize) {
    metrics::histogram!("gwlocate_gateways_ranked").record(count as f64);
}
