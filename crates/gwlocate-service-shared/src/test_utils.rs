//! Test utilities for handler testing.
//!
//! The fixture state is built from `docs/fixtures/eip-service.json`, resolved
//! against the bundled gazetteer, with a [`StaticLocator`] standing in for the
//! GeoLite2 database.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::OnceLock;

use gwlocate_lib::{
    fetch_directory, Coordinates, Denylist, DirectorySource, GatewayDirectory, GatewayRanker,
    Gazetteer, GeoRecord, StaticLocator,
};

use crate::state::AppState;

/// Path to the fixture gateway directory.
pub const TEST_FIXTURE_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../docs/fixtures/eip-service.json"
);

static TEST_STATE: OnceLock<AppState> = OnceLock::new();

/// Known requesters and gateways in the fixture.
pub mod fixture_clients {
    /// Resolves to Seattle, US.
    pub const SEATTLE: &str = "198.51.100.7";
    /// Resolves to Amsterdam, NL.
    pub const AMSTERDAM: &str = "192.0.2.55";
    /// Resolves to a country-level record with no city name.
    pub const COUNTRY_ONLY: &str = "2001:db8::7";
    /// Not in the locator at all.
    pub const UNKNOWN: &str = "203.0.113.200";

    pub const SEATTLE_GATEWAY: &str = "sea-gw1.example.net";
    pub const DENYLISTED_GATEWAY: &str = "hkg-gw1.example.net";
}

/// Locator answering for the [`fixture_clients`] addresses.
///
/// # Panics
///
/// Panics if a fixture address constant fails to parse.
pub fn fixture_locator() -> StaticLocator {
    let ip = |s: &str| -> IpAddr { s.parse().unwrap_or_else(|_| panic!("bad fixture ip {}", s)) };
    StaticLocator::new()
        .with_record(
            ip(fixture_clients::SEATTLE),
            GeoRecord {
                country_code: "US".to_string(),
                city: "Seattle".to_string(),
                coordinates: Coordinates::new(47.6062, -122.3321),
            },
        )
        .with_record(
            ip(fixture_clients::AMSTERDAM),
            GeoRecord {
                country_code: "NL".to_string(),
                city: "Amsterdam".to_string(),
                coordinates: Coordinates::new(52.3676, 4.9041),
            },
        )
        .with_record(
            ip(fixture_clients::COUNTRY_ONLY),
            GeoRecord {
                country_code: "DE".to_string(),
                city: String::new(),
                coordinates: Coordinates::new(51.2993, 9.491),
            },
        )
}

/// Shared fixture state. The hong-kong gateway is denylisted.
///
/// # Panics
///
/// Panics if the fixture directory cannot be loaded.
pub fn test_state() -> AppState {
    TEST_STATE
        .get_or_init(|| {
            let path = PathBuf::from(TEST_FIXTURE_PATH);
            let service = fetch_directory(&DirectorySource::File(path.clone()))
                .unwrap_or_else(|e| panic!("failed to load fixture from {:?}: {}", path, e));
            let gazetteer = Gazetteer::bundled()
                .unwrap_or_else(|e| panic!("failed to load bundled gazetteer: {}", e));
            let directory = GatewayDirectory::resolve(service, &gazetteer);

            AppState::from_components(
                GatewayRanker::from_directory(&directory),
                Denylist::parse(fixture_clients::DENYLISTED_GATEWAY),
                Box::new(fixture_locator()),
            )
        })
        .clone()
}

/// State whose snapshot holds no gateways.
pub fn empty_state() -> AppState {
    AppState::from_components(
        GatewayRanker::from_gateways(&[]),
        Denylist::default(),
        Box::new(fixture_locator()),
    )
}

pub fn fixture_directory_path() -> PathBuf {
    PathBuf::from(TEST_FIXTURE_PATH)
}

pub fn test_request_id() -> String {
    format!("test-{}", uuid::Uuid::now_v7())
}
