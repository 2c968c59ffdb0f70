use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the gateway geolocation library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The gateway directory endpoint answered with a non-success status.
    #[error("gateway directory request to {url} failed with status {status}")]
    DirectoryStatus { url: String, status: u16 },

    /// The gateway directory payload could not be decoded.
    #[error("failed to decode gateway directory from {source_name}: {message}")]
    DirectoryDecode {
        source_name: String,
        message: String,
    },

    /// A gazetteer table row could not be parsed.
    #[error("invalid gazetteer table {source_name}: {message}")]
    GazetteerFormat {
        source_name: String,
        message: String,
    },

    /// The geolocation database could not be opened.
    #[error("failed to open geolocation database at {path}: {message}")]
    GeoDatabaseOpen { path: PathBuf, message: String },

    /// The requester address is not present in the geolocation database.
    #[error("no geolocation record for address {ip}")]
    AddressNotFound { ip: IpAddr },

    /// The geolocation record exists but carries no coordinates.
    #[error("geolocation record for {ip} has no location")]
    LocationUnavailable { ip: IpAddr },

    /// Any other geolocation provider failure.
    #[error("geolocation lookup for {ip} failed: {message}")]
    GeoLookup { ip: IpAddr, message: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
