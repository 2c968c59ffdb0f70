//! Command-line configuration.
//!
//! Every flag falls back to a `GWLOCATE_*` environment variable.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use gwlocate_lib::{Denylist, DirectorySource, DEFAULT_EIP_URL};
use gwlocate_service_shared::StateConfig;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "gwlocate",
    version,
    about = "Rank VPN gateways by distance from the requester"
)]
pub struct ServiceConfig {
    /// GeoLite2-City database
    #[arg(
        long,
        env = "GWLOCATE_GEODB",
        default_value = "/var/lib/GeoIP/GeoLite2-City.mmdb"
    )]
    pub geodb: PathBuf,

    /// Listen port
    #[arg(long, env = "GWLOCATE_PORT", default_value_t = 9001)]
    pub port: u16,

    /// TLS private key (PEM); requires --server-crt
    #[arg(long, env = "GWLOCATE_SERVER_KEY")]
    pub server_key: Option<PathBuf>,

    /// TLS certificate chain (PEM); requires --server-key
    #[arg(long, env = "GWLOCATE_SERVER_CRT")]
    pub server_crt: Option<PathBuf>,

    /// Comma-separated gateway hosts never returned
    #[arg(long, env = "GWLOCATE_FORBID", default_value = "")]
    pub forbid: String,

    /// Gateway directory URL
    #[arg(long, env = "GWLOCATE_EIP_URL", default_value = DEFAULT_EIP_URL)]
    pub eip_url: String,

    /// Read the gateway directory from a local JSON file instead of fetching it
    #[arg(long, env = "GWLOCATE_GATEWAYS_FILE")]
    pub gateways_file: Option<PathBuf>,

    /// `city,lat,lon` CSV replacing the bundled city table
    #[arg(long, env = "GWLOCATE_CITIES_FILE")]
    pub cities_file: Option<PathBuf>,
}

/// How the listener speaks to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenMode {
    Plain,
    Tls { cert: PathBuf, key: PathBuf },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--server-key and --server-crt must be given together (missing {missing})")]
    IncompleteTls { missing: &'static str },

    #[error("{flag} file not found: {path}")]
    MissingFile { flag: &'static str, path: PathBuf },
}

impl ServiceConfig {
    /// TLS when both key and certificate are set, plaintext when neither is.
    pub fn listen_mode(&self) -> Result<ListenMode, ConfigError> {
        match (&self.server_key, &self.server_crt) {
            (None, None) => Ok(ListenMode::Plain),
            (Some(_), None) => Err(ConfigError::IncompleteTls {
                missing: "--server-crt",
            }),
            (None, Some(_)) => Err(ConfigError::IncompleteTls {
                missing: "--server-key",
            }),
            (Some(key), Some(cert)) => {
                for (flag, path) in [("--server-key", key), ("--server-crt", cert)] {
                    if !path.exists() {
                        return Err(ConfigError::MissingFile {
                            flag,
                            path: path.clone(),
                        });
                    }
                }
                Ok(ListenMode::Tls {
                    cert: cert.clone(),
                    key: key.clone(),
                })
            }
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn denylist(&self) -> Denylist {
        Denylist::parse(&self.forbid)
    }

    /// A local gateways file takes precedence over the URL.
    pub fn directory_source(&self) -> DirectorySource {
        match &self.gateways_file {
            Some(path) => DirectorySource::File(path.clone()),
            None => DirectorySource::Remote(self.eip_url.clone()),
        }
    }

    pub fn state_config(&self) -> StateConfig {
        StateConfig {
            geodb_path: self.geodb.clone(),
            directory: self.directory_source(),
            cities_path: self.cities_file.clone(),
            denylist: self.denylist(),
        }
    }
}
