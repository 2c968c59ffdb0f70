//! Requester geolocation.
//!
//! [`GeoLocator`] is the seam between the HTTP layer and whatever resolves an
//! address to a place. [`MaxMindLocator`] reads a GeoLite2-City database held
//! in memory; [`StaticLocator`] answers from a fixed table and is used for
//! tests and offline runs.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use maxminddb::{geoip2, MaxMindDBError, Reader};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::geodesy::Coordinates;

/// What the service needs to know about a requester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    /// ISO 3166-1 alpha-2 country code, empty when unknown.
    pub country_code: String,
    /// English city name, empty when unknown.
    pub city: String,
    pub coordinates: Coordinates,
}

/// Resolves an address to a [`GeoRecord`].
pub trait GeoLocator: Send + Sync {
    fn locate(&self, ip: IpAddr) -> Result<GeoRecord>;
}

/// GeoLite2-City backed locator.
pub struct MaxMindLocator {
    reader: Reader<Vec<u8>>,
}

impl MaxMindLocator {
    /// Read the whole database into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = Reader::open_readfile(path).map_err(|e| Error::GeoDatabaseOpen {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        info!(
            path = %path.display(),
            database_type = %reader.metadata.database_type,
            "opened geolocation database"
        );

        Ok(Self { reader })
    }
}

impl std::fmt::Debug for MaxMindLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxMindLocator")
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}

impl GeoLocator for MaxMindLocator {
    fn locate(&self, ip: IpAddr) -> Result<GeoRecord> {
        let city: geoip2::City = self.reader.lookup(ip).map_err(|e| match e {
            MaxMindDBError::AddressNotFoundError(_) => Error::AddressNotFound { ip },
            other => Error::GeoLookup {
                ip,
                message: other.to_string(),
            },
        })?;

        let location = city
            .location
            .as_ref()
            .ok_or(Error::LocationUnavailable { ip })?;
        let (Some(latitude), Some(longitude)) = (location.latitude, location.longitude) else {
            return Err(Error::LocationUnavailable { ip });
        };

        let country_code = city
            .country
            .as_ref()
            .and_then(|c| c.iso_code)
            .unwrap_or_default()
            .to_string();

        let city_name = city
            .city
            .as_ref()
            .and_then(|c| c.names.as_ref())
            .and_then(|names| names.get("en"))
            .map(|name| name.to_string())
            .unwrap_or_default();

        Ok(GeoRecord {
            country_code,
            city: city_name,
            coordinates: Coordinates::new(latitude, longitude),
        })
    }
}

/// Fixed address table.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    records: HashMap<IpAddr, GeoRecord>,
}

impl StaticLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, ip: IpAddr, record: GeoRecord) -> Self {
        self.records.insert(ip, record);
        self
    }
}

impl GeoLocator for StaticLocator {
    fn locate(&self, ip: IpAddr) -> Result<GeoRecord> {
        self.records
            .get(&ip)
            .cloned()
            .ok_or(Error::AddressNotFound { ip })
    }
}
