//! Gateway geolocation library entry points.
//!
//! This crate places a fixed set of gateways on the globe and ranks them by
//! proximity to a requester. The startup pipeline is:
//!
//! ```text
//! fetch_directory ─► Gazetteer::geolocate ─► geodesy::project ─► SpatialIndex::build
//!                                                              └─► GatewayGroup map
//! ```
//!
//! The result is a [`GatewayRanker`], an immutable snapshot that answers
//! [`GatewayRanker::rank`] for every request. Higher-level consumers (the HTTP
//! service) should only depend on the items exported here.

#![deny(warnings)]

pub mod directory;
pub mod error;
pub mod gazetteer;
pub mod geodesy;
pub mod geoip;
pub mod ranker;
pub mod spatial;

pub use directory::{
    fetch_directory, DirectorySource, EipService, Gateway, GatewayDirectory, GatewayEntry,
    LocationInfo, DEFAULT_EIP_URL,
};
pub use error::{Error, Result};
pub use gazetteer::{normalize_city, Gazetteer, Resolution, SENTINEL};
pub use geodesy::{project, Coordinates, Ellipsoid, SpatialPoint};
pub use geoip::{GeoLocator, GeoRecord, MaxMindLocator, StaticLocator};
pub use ranker::{Denylist, GatewayGroup, GatewayRanker};
pub use spatial::{Neighbour, SpatialIndex};
