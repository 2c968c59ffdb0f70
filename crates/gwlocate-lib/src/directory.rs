//! Gateway directory: fetch, decode and place gateways on the map.
//!
//! The directory is an EIP service document published by the provider:
//!
//! ```json
//! {
//!   "gateways": [{"host": "gw1.example.org", "location": "amsterdam", "ip_address": "1.2.3.4"}],
//!   "locations": {"amsterdam": {"country_code": "NL", "hemisphere": "N", "name": "Amsterdam", "timezone": "+2"}}
//! }
//! ```
//!
//! It is fetched exactly once at startup with an empty-body `POST`. Any
//! transport error, non-200 status or decode failure is returned to the
//! caller, which treats it as fatal. A local JSON file can stand in for the
//! remote endpoint.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gazetteer::Gazetteer;
use crate::geodesy::Coordinates;

/// Default public EIP service document.
pub const DEFAULT_EIP_URL: &str = "https://black.riseup.net/1/config/eip-service.json";

const USER_AGENT: &str = concat!("gwlocate/", env!("CARGO_PKG_VERSION"));

/// Gateway record as published in the directory document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEntry {
    pub host: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub ip_address: String,
}

/// Per-location metadata published alongside the gateways.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub hemisphere: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timezone: String,
}

/// Decoded directory document. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EipService {
    #[serde(default)]
    pub gateways: Vec<GatewayEntry>,
    #[serde(default)]
    pub locations: HashMap<String, LocationInfo>,
}

impl EipService {
    pub fn from_json(bytes: &[u8], source_name: &str) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::DirectoryDecode {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Where the directory document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorySource {
    /// Remote EIP endpoint, queried with an empty-body POST.
    Remote(String),
    /// Local JSON file with the same shape as the remote document.
    File(PathBuf),
}

impl Default for DirectorySource {
    fn default() -> Self {
        DirectorySource::Remote(DEFAULT_EIP_URL.to_string())
    }
}

impl std::fmt::Display for DirectorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectorySource::Remote(url) => write!(f, "{}", url),
            DirectorySource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch and decode the directory document. Blocking.
pub fn fetch_directory(source: &DirectorySource) -> Result<EipService> {
    match source {
        DirectorySource::Remote(url) => fetch_remote(url),
        DirectorySource::File(path) => load_from_file(path),
    }
}

fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(Error::from)
}

fn fetch_remote(url: &str) -> Result<EipService> {
    info!(url = url, "fetching gateway directory");
    let client = build_client()?;
    let response = client
        .post(url)
        .header(ACCEPT, "application/json")
        .send()?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(Error::DirectoryStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes()?;
    EipService::from_json(&body, url)
}

fn load_from_file(path: &Path) -> Result<EipService> {
    info!(path = %path.display(), "loading gateway directory from file");
    let bytes = fs::read(path)?;
    EipService::from_json(&bytes, &path.display().to_string())
}

/// A gateway with its resolved position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    pub host: String,
    pub location: String,
    pub ip_address: String,
    pub coordinates: Coordinates,
}

impl Gateway {
    pub fn new(
        host: impl Into<String>,
        location: impl Into<String>,
        ip_address: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            host: host.into(),
            location: location.into(),
            ip_address: ip_address.into(),
            coordinates,
        }
    }
}

/// The full set of gateways, placed on the map. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct GatewayDirectory {
    gateways: Vec<Gateway>,
    locations: HashMap<String, LocationInfo>,
}

impl GatewayDirectory {
    /// Resolve every gateway's location label through `gazetteer`.
    ///
    /// Unknown labels degrade to the gazetteer sentinel rather than failing.
    pub fn resolve(service: EipService, gazetteer: &Gazetteer) -> Self {
        let gateways = service
            .gateways
            .into_iter()
            .map(|entry| {
                let coordinates = gazetteer.geolocate(&entry.location);
                debug!(
                    host = %entry.host,
                    location = %entry.location,
                    lat = coordinates.latitude,
                    lon = coordinates.longitude,
                    "resolved gateway location"
                );
                Gateway {
                    host: entry.host,
                    location: entry.location,
                    ip_address: entry.ip_address,
                    coordinates,
                }
            })
            .collect();

        Self {
            gateways,
            locations: service.locations,
        }
    }

    /// Build from already-placed gateways.
    pub fn from_gateways(gateways: Vec<Gateway>) -> Self {
        Self {
            gateways,
            locations: HashMap::new(),
        }
    }

    pub fn gateways(&self) -> &[Gateway] {
        &self.gateways
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    pub fn locations(&self) -> &HashMap<String, LocationInfo> {
        &self.locations
    }

    /// Metadata for a location key, if the directory published any.
    pub fn location(&self, key: &str) -> Option<&LocationInfo> {
        self.locations.get(key)
    }

    /// Log every gateway with its resolved position.
    pub fn log_gateways(&self) {
        for gateway in &self.gateways {
            let country = self
                .location(&gateway.location)
                .map(|l| l.country_code.as_str())
                .unwrap_or("");
            info!(
                host = %gateway.host,
                location = %gateway.location,
                country = country,
                ip = %gateway.ip_address,
                lat = gateway.coordinates.latitude,
                lon = gateway.coordinates.longitude,
                "gateway"
            );
        }
    }
}
