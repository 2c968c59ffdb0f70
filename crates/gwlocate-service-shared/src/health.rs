//! Health check handlers for liveness and readiness probes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response for liveness and readiness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Number of gateways in the ranking snapshot (readiness only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateways_loaded: Option<usize>,

    /// Number of distinct gateway locations (readiness only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations_indexed: Option<usize>,
}

impl HealthStatus {
    pub fn alive(service: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            gateways_loaded: None,
            locations_indexed: None,
        }
    }

    pub fn ready(service: &str, version: &str, gateways: usize, locations: usize) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            gateways_loaded: Some(gateways),
            locations_indexed: Some(locations),
        }
    }

    pub fn not_ready(service: &str, version: &str, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            service: service.to_string(),
            version: version.to_string(),
            gateways_loaded: None,
            locations_indexed: None,
        }
    }
}

/// Liveness probe handler.
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"gwlocate-service-shared","version":"0.1.0"}
/// ```
pub async fn health_live() -> impl IntoResponse {
    let status = HealthStatus::alive(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    (StatusCode::OK, Json(status))
}

/// Readiness probe handler. Not ready while the snapshot holds no gateways.
///
/// ```text
/// GET /health/ready
/// {"status":"ok",...,"gateways_loaded":42,"locations_indexed":17}
/// ```
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let service = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    let ranker = state.ranker();
    if ranker.gateway_count() == 0 {
        let status = HealthStatus::not_ready(service, version, "no gateways loaded");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    let status = HealthStatus::ready(
        service,
        version,
        ranker.gateway_count(),
        ranker.location_count(),
    );
    (StatusCode::OK, Json(status)).into_response()
}
