//! `gwlocate` server binary.

use clap::Parser;
use tracing::{error, info};

use gwlocate_service::config::{ListenMode, ServiceConfig};
use gwlocate_service::router;
use gwlocate_service::tls::{load_tls_config, TlsListener};
use gwlocate_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, PeerAddr,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::parse();

    let logging_config = LoggingConfig::from_env().with_service("gwlocate");
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if !metrics_config.enabled {
        info!("metrics disabled");
    } else if let Err(e) = init_metrics(&metrics_config) {
        tracing::warn!(error = %e, "failed to initialize metrics, continuing without metrics");
    }

    let mode = config.listen_mode().inspect_err(|e| {
        error!(error = %e, "invalid TLS configuration");
    })?;
    let tls_config = match &mode {
        ListenMode::Tls { cert, key } => Some(load_tls_config(cert, key).inspect_err(|e| {
            error!(error = %e, "failed to load TLS material");
        })?),
        ListenMode::Plain => None,
    };

    let denylist = config.denylist();
    info!(
        geodb = %config.geodb.display(),
        port = config.port,
        tls = tls_config.is_some(),
        forbidden = ?denylist.sorted(),
        "starting gwlocate"
    );

    let state_config = config.state_config();
    let state = tokio::task::spawn_blocking(move || AppState::bootstrap(&state_config))
        .await?
        .inspect_err(|e| {
            error!(error = %e, "failed to load application state");
        })?;

    info!(
        gateways = state.ranker().gateway_count(),
        locations = state.ranker().location_count(),
        denylisted = state.denylist().len(),
        "application state loaded"
    );

    let app = router(state, &metrics_config).into_make_service_with_connect_info::<PeerAddr>();

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, tls = tls_config.is_some(), "listening");

    match tls_config {
        Some(tls_config) => axum::serve(TlsListener::new(listener, tls_config)?, app).await?,
        None => axum::serve(listener, app).await?,
    }

    Ok(())
}
