//! Shared infrastructure for the gateway geolocation HTTP service.
//!
//! - [`AppState`]: the immutable startup snapshot (ranking index, denylist,
//!   requester geolocator)
//! - [`health`]: liveness and readiness probe handlers
//! - [`ProblemDetails`]: RFC 9457 Problem Details for per-request failures
//! - [`ClientAddr`] / [`RequestId`]: request metadata extractors, fed by
//!   [`PeerAddr`] connect info
//! - [`metrics`]: Prometheus metrics
//! - [`logging`]: structured logging setup
//!
//! # Architecture
//!
//! Handlers stay thin; the ranking logic lives in `gwlocate-lib`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  axum Handler                                               │
//! │  - Extract requester address                                │
//! │  - Locate it through the GeoLocator                         │
//! │  - Rank gateways with gwlocate-lib                          │
//! │  - Format response                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! Enable the `test-utils` feature to use [`test_utils`] from dependent crates.

#![deny(warnings)]

pub mod health;
pub mod logging;
pub mod metrics;
mod problem;
mod request;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_gateways_ranked, record_lookup, record_lookup_failed,
    MetricsConfig, MetricsError,
};
pub use problem::{
    from_lib_error, ProblemDetails, PROBLEM_ADDRESS_NOT_FOUND, PROBLEM_INTERNAL_ERROR,
    PROBLEM_INVALID_ADDRESS,
};
pub use request::{
    extract_or_generate_request_id, parse_forwarded_for, AddrSource, ClientAddr, PeerAddr,
    RequestId, FORWARDED_FOR_HEADER, REQUEST_ID_HEADER,
};
pub use state::{AppState, AppStateError, StateConfig};
