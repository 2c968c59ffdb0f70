//! Geodetic to Earth-centred Cartesian projection.
//!
//! Gateways and requesters are compared in ECEF space (Earth-Centred,
//! Earth-Fixed, metres). Every point fed into the spatial index and every
//! query point must come from the same [`Ellipsoid`], otherwise relative
//! distances stop being comparable. [`project`] always uses
//! [`Ellipsoid::WGS84`] and is the only projection the rest of the crate calls.

use serde::{Deserialize, Serialize};

/// Geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A point in ECEF space, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialPoint(pub [f64; 3]);

impl SpatialPoint {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn y(&self) -> f64 {
        self.0[1]
    }

    pub fn z(&self) -> f64 {
        self.0[2]
    }

    /// Value along `axis` (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, axis: usize) -> f64 {
        self.0[axis]
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_squared(&self, other: &SpatialPoint) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Bit-exact identity key, used to group co-located gateways.
    ///
    /// `-0.0` is folded into `0.0` so the key agrees with `==`.
    pub fn key(&self) -> [u64; 3] {
        self.0.map(|v| (v + 0.0).to_bits())
    }
}

/// Reference ellipsoid parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres.
    pub semi_major_axis: f64,
    /// Flattening.
    pub flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: 6_378_137.0,
        flattening: 1.0 / 298.257_223_563,
    };

    /// First eccentricity squared.
    pub fn eccentricity_squared(&self) -> f64 {
        self.flattening * (2.0 - self.flattening)
    }

    /// Convert geodetic latitude/longitude (degrees) and height (metres) to ECEF.
    pub fn to_ecef(&self, latitude: f64, longitude: f64, height: f64) -> SpatialPoint {
        let phi = latitude.to_radians();
        let lambda = longitude.to_radians();
        let e2 = self.eccentricity_squared();

        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_lambda, cos_lambda) = lambda.sin_cos();

        // Prime vertical radius of curvature.
        let n = self.semi_major_axis / (1.0 - e2 * sin_phi * sin_phi).sqrt();

        SpatialPoint::new(
            (n + height) * cos_phi * cos_lambda,
            (n + height) * cos_phi * sin_lambda,
            (n * (1.0 - e2) + height) * sin_phi,
        )
    }
}

/// Project coordinates onto the WGS84 surface (zero height).
pub fn project(coordinates: Coordinates) -> SpatialPoint {
    Ellipsoid::WGS84.to_ecef(coordinates.latitude, coordinates.longitude, 0.0)
}
