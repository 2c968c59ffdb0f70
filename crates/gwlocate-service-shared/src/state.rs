//! Application state for the HTTP service.
//!
//! [`AppState`] is the startup snapshot every handler reads from: the gateway
//! ranking index, the denylist and the requester geolocator. It is assembled
//! once, in a fixed order (open geolocation database → fetch directory →
//! resolve cities → project → build index and groups), and never mutated.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gwlocate_lib::{
    fetch_directory, Denylist, DirectorySource, Error as LibError, GatewayDirectory,
    GatewayRanker, Gazetteer, GeoLocator, MaxMindLocator,
};

/// Error during application state initialization.
#[derive(Debug)]
pub enum AppStateError {
    /// Geolocation database file not found.
    DatabaseNotFound(String),

    /// Failed to open the geolocation database.
    GeoDatabase(LibError),

    /// Failed to load the city gazetteer.
    Gazetteer(LibError),

    /// Failed to fetch or decode the gateway directory.
    Directory(LibError),
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseNotFound(path) => write!(f, "geolocation database not found: {}", path),
            Self::GeoDatabase(e) => write!(f, "failed to open geolocation database: {}", e),
            Self::Gazetteer(e) => write!(f, "failed to load gazetteer: {}", e),
            Self::Directory(e) => write!(f, "failed to load gateway directory: {}", e),
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::GeoDatabase(e) | Self::Gazetteer(e) | Self::Directory(e) => Some(e),
            Self::DatabaseNotFound(_) => None,
        }
    }
}

/// Inputs needed to assemble the startup snapshot.
#[derive(Debug, Clone)]
pub struct StateConfig {
    /// Path to the GeoLite2-City database.
    pub geodb_path: PathBuf,
    /// Where the gateway directory is read from.
    pub directory: DirectorySource,
    /// Optional `city,lat,lon` table replacing the bundled gazetteer.
    pub cities_path: Option<PathBuf>,
    /// Hosts never returned in a ranking.
    pub denylist: Denylist,
}

/// Shared application state for all axum handlers.
///
/// Cheaply cloneable (an `Arc` internally); share it through axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    ranker: GatewayRanker,
    denylist: Denylist,
    locator: Box<dyn GeoLocator>,
}

impl AppState {
    /// Build the snapshot from configuration. Blocking: performs file IO and
    /// the directory fetch, so call it from `spawn_blocking` inside a runtime.
    pub fn bootstrap(config: &StateConfig) -> Result<Self, AppStateError> {
        let locator = open_locator(&config.geodb_path)?;

        let gazetteer = match &config.cities_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading gazetteer");
                Gazetteer::from_path(path)
            }
            None => {
                tracing::info!(
                    "loading bundled gazetteer; supply a full city table for production"
                );
                Gazetteer::bundled()
            }
        }
        .map_err(AppStateError::Gazetteer)?;
        tracing::info!(cities = gazetteer.len(), "gazetteer loaded");

        tracing::info!(source = %config.directory, "seeding gateway list");
        let service = fetch_directory(&config.directory).map_err(AppStateError::Directory)?;
        let directory = GatewayDirectory::resolve(service, &gazetteer);
        directory.log_gateways();

        let ranker = GatewayRanker::from_directory(&directory);

        Ok(Self::from_components(
            ranker,
            config.denylist.clone(),
            Box::new(locator),
        ))
    }

    /// Create application state from pre-built components.
    ///
    /// This is useful for testing or for alternative geolocation backends.
    pub fn from_components(
        ranker: GatewayRanker,
        denylist: Denylist,
        locator: Box<dyn GeoLocator>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                ranker,
                denylist,
                locator,
            }),
        }
    }

    pub fn ranker(&self) -> &GatewayRanker {
        &self.inner.ranker
    }

    pub fn denylist(&self) -> &Denylist {
        &self.inner.denylist
    }

    pub fn locator(&self) -> &dyn GeoLocator {
        self.inner.locator.as_ref()
    }
}

fn open_locator(path: &Path) -> Result<MaxMindLocator, AppStateError> {
    if !path.exists() {
        return Err(AppStateError::DatabaseNotFound(path.display().to_string()));
    }
    MaxMindLocator::open(path).map_err(AppStateError::GeoDatabase)
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("gateway_count", &self.inner.ranker.gateway_count())
            .field("location_count", &self.inner.ranker.location_count())
            .field("denylisted", &self.inner.denylist.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwlocate_lib::{Coordinates, Gateway, StaticLocator};

    fn minimal_state() -> AppState {
        let ranker = GatewayRanker::from_gateways(&[Gateway::new(
            "gw.example.net",
            "amsterdam",
            "192.0.2.1",
            Coordinates::new(52.37, 4.89),
        )]);
        AppState::from_components(
            ranker,
            Denylist::parse("blocked.example.net"),
            Box::new(StaticLocator::new()),
        )
    }

    #[test]
    fn test_app_state_from_components() {
        let state = minimal_state();
        assert_eq!(state.ranker().gateway_count(), 1);
        assert!(state.denylist().contains("blocked.example.net"));
    }

    #[test]
    fn test_app_state_clone_shares_snapshot() {
        let state1 = minimal_state();
        let state2 = state1.clone();
        assert!(Arc::ptr_eq(&state1.inner, &state2.inner));
    }

    #[test]
    fn test_app_state_debug() {
        let debug = format!("{:?}", minimal_state());
        assert!(debug.contains("AppState"));
        assert!(debug.contains("gateway_count"));
        assert!(debug.contains("denylisted"));
    }

    #[test]
    fn test_app_state_error_display() {
        let err = AppStateError::DatabaseNotFound("/path/to/db".to_string());
        assert!(err.to_string().contains("/path/to/db"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_bootstrap_missing_database() {
        let config = StateConfig {
            geodb_path: PathBuf::from("/nonexistent/GeoLite2-City.mmdb"),
            directory: DirectorySource::File(PathBuf::from("/nonexistent/eip.json")),
            cities_path: None,
            denylist: Denylist::default(),
        };

        match AppState::bootstrap(&config).unwrap_err() {
            AppStateError::DatabaseNotFound(path) => assert!(path.contains("nonexistent")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
