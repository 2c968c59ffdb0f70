//! Gateway geolocation HTTP service.
//!
//! Locates the requester through the GeoLite2 database and answers with the
//! gateways of the startup snapshot ranked by distance from them.
//!
//! # Endpoints
//!
//! - `GET /json` - requester location and ranked gateways as JSON
//! - `GET /` - requester location as plain text
//! - `GET /metrics` - Prometheus metrics (path set by `METRICS_PATH`)
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness probe
//!
//! # Configuration
//!
//! See [`config::ServiceConfig`] for the command-line flags. Ambient settings
//! come from the environment:
//!
//! - `RUST_LOG` - log level (default: info)
//! - `LOG_FORMAT` - json (default) or text
//! - `METRICS_ENABLED` - set to "false" to disable metrics and their route
//! - `METRICS_PATH` - metrics endpoint path (default: /metrics)

#![deny(warnings)]

pub mod config;
pub mod tls;

use std::net::IpAddr;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use gwlocate_lib::{Error as LibError, GeoRecord};
use gwlocate_service_shared::{
    from_lib_error, health_live, health_ready, metrics_handler, record_gateways_ranked,
    record_lookup, record_lookup_failed, AppState, ClientAddr, MetricsConfig, ProblemDetails,
    RequestId,
};

/// Body of `GET /json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocationResponse {
    pub ip: String,
    /// ISO country code of the requester.
    pub cc: String,
    pub city: String,
    /// Latitude with six decimals.
    pub lat: String,
    /// Longitude with six decimals.
    pub lon: String,
    /// Gateway hosts, nearest first.
    pub gateways: Vec<String>,
}

impl GeolocationResponse {
    fn new(ip: IpAddr, record: GeoRecord, gateways: Vec<String>) -> Self {
        Self {
            ip: ip.to_string(),
            cc: record.country_code,
            city: record.city,
            lat: format_coordinate(record.coordinates.latitude),
            lon: format_coordinate(record.coordinates.longitude),
            gateways,
        }
    }

    /// Plain-text rendering served at `GET /`.
    pub fn to_text(&self) -> String {
        format!(
            "Your IP: {}\nYour Country: {}\nYour City: {}\nYour Coordinates: {}, {}\n",
            self.ip, self.cc, self.city, self.lat, self.lon
        )
    }
}

pub fn format_coordinate(degrees: f64) -> String {
    format!("{:.6}", degrees)
}

/// Build the service router around a startup snapshot.
///
/// The metrics endpoint is mounted at `metrics.path` only while metrics are
/// enabled.
pub fn router(state: AppState, metrics: &MetricsConfig) -> Router {
    let mut router = Router::new()
        .route("/json", get(json_handler))
        .route("/", get(text_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready));
    if metrics.enabled {
        router = router.route(&metrics.path, get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn json_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    client: Result<ClientAddr, ProblemDetails>,
) -> Result<Json<GeolocationResponse>, ProblemDetails> {
    let response = geolocate(&state, client, &request_id, "json")?;
    Ok(Json(response))
}

async fn text_handler(
    State(state): State<AppState>,
    request_id: RequestId,
    client: Result<ClientAddr, ProblemDetails>,
) -> Result<impl IntoResponse, ProblemDetails> {
    let response = geolocate(&state, client, &request_id, "text")?;
    Ok(response.to_text())
}

/// Locate the requester and rank gateways against the snapshot.
fn geolocate(
    state: &AppState,
    client: Result<ClientAddr, ProblemDetails>,
    request_id: &RequestId,
    endpoint: &str,
) -> Result<GeolocationResponse, ProblemDetails> {
    let client = client.inspect_err(|problem| {
        warn!(
            request_id = %request_id,
            detail = problem.detail.as_deref().unwrap_or(""),
            "rejecting request without a usable address"
        );
        record_lookup_failed("invalid_address");
    })?;

    let record = state.locator().locate(client.ip).map_err(|e| {
        let reason = match &e {
            LibError::AddressNotFound { .. } | LibError::LocationUnavailable { .. } => {
                "address_not_found"
            }
            _ => "internal",
        };
        warn!(request_id = %request_id, ip = %client.ip, error = %e, "lookup failed");
        record_lookup_failed(reason);
        from_lib_error(&e, request_id.as_str())
    })?;

    let gateways = state
        .ranker()
        .rank_coordinates(record.coordinates, state.denylist());

    record_lookup(&record.country_code, endpoint);
    record_gateways_ranked(gateways.len());

    info!(
        request_id = %request_id,
        ip = %client.ip,
        source = ?client.source,
        country = %record.country_code,
        city = %record.city,
        gateways = gateways.len(),
        "ranked gateways for requester"
    );

    Ok(GeolocationResponse::new(client.ip, record, gateways))
}
