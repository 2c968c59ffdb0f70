//! City-name gazetteer used to place gateways on the map.
//!
//! Gateway directories only carry a free-text location label. The gazetteer
//! turns that label into coordinates with a fixed policy:
//!
//! 1. normalize the label (lower case, hyphens and spaces removed);
//! 2. exact match against the city table;
//! 3. otherwise check the manual overrides for cities missing from the table;
//! 4. otherwise fall back to [`SENTINEL`] `(0, 0)`.
//!
//! The sentinel is a real position in the Gulf of Guinea, so an unresolved
//! gateway ranks as if it were located there. It is kept as-is and logged.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::geodesy::Coordinates;

/// Coordinates assigned to labels the gazetteer cannot resolve.
pub const SENTINEL: Coordinates = Coordinates::new(0.0, 0.0);

/// City table compiled into the library (`city,lat,lon`).
///
/// A few dozen cities, enough for tests and small deployments. Production
/// directories should load a full world table through [`Gazetteer::from_path`].
const BUNDLED_CITIES: &str = include_str!("../data/cities.csv");

/// Cities known to be missing from the table.
const MANUAL_OVERRIDES: &[(&str, Coordinates)] =
    &[("hongkong", Coordinates::new(22.319201099, 114.1696121))];

/// Where a resolved coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Table(Coordinates),
    Override(Coordinates),
}

impl Resolution {
    pub fn coordinates(&self) -> Coordinates {
        match self {
            Resolution::Table(c) | Resolution::Override(c) => *c,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CityRow {
    city: String,
    lat: f64,
    lon: f64,
}

/// Static name-to-coordinate table.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    cities: HashMap<String, Coordinates>,
    overrides: HashMap<String, Coordinates>,
}

/// Canonical form used for every lookup key.
pub fn normalize_city(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect()
}

impl Gazetteer {
    /// Gazetteer backed by the table shipped with the library.
    pub fn bundled() -> Result<Self> {
        Self::from_reader(BUNDLED_CITIES.as_bytes(), "bundled cities.csv")
    }

    /// Load a `city,lat,lon` CSV table from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new().trim(Trim::Fields).from_reader(reader);

        let mut entries = Vec::new();
        for (row, record) in csv_reader.deserialize::<CityRow>().enumerate() {
            let record = record.map_err(|e| Error::GazetteerFormat {
                source_name: source_name.to_string(),
                message: format!("row {}: {}", row + 1, e),
            })?;
            entries.push((record.city, Coordinates::new(record.lat, record.lon)));
        }

        let gazetteer = Self::from_entries(entries);
        debug!(
            source = source_name,
            cities = gazetteer.len(),
            "loaded gazetteer"
        );
        Ok(gazetteer)
    }

    /// Build from in-memory entries. The first entry wins when two names
    /// normalize to the same key.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinates)>,
        S: AsRef<str>,
    {
        let mut cities = HashMap::new();
        for (name, coordinates) in entries {
            cities
                .entry(normalize_city(name.as_ref()))
                .or_insert(coordinates);
        }

        let overrides = MANUAL_OVERRIDES
            .iter()
            .map(|(name, coordinates)| (name.to_string(), *coordinates))
            .collect();

        Self { cities, overrides }
    }

    /// Number of cities in the table (overrides excluded).
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Resolve a label without applying the sentinel fallback.
    pub fn lookup(&self, label: &str) -> Option<Resolution> {
        let canonical = normalize_city(label);
        if let Some(coordinates) = self.cities.get(&canonical) {
            return Some(Resolution::Table(*coordinates));
        }
        self.overrides
            .get(&canonical)
            .map(|coordinates| Resolution::Override(*coordinates))
    }

    /// Resolve a label, degrading to [`SENTINEL`] when it is unknown.
    pub fn geolocate(&self, label: &str) -> Coordinates {
        match self.lookup(label) {
            Some(resolution) => resolution.coordinates(),
            None => {
                warn!(
                    city = label,
                    "city not found in gazetteer, using sentinel coordinates"
                );
                SENTINEL
            }
        }
    }
}
