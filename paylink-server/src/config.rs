//! Server configuration.
//!
//! Loaded from a TOML file; a missing file means "all defaults".
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8050
//! wallet_header = "wallet_connection_string"
//!
//! [policies]
//! add = 0.10
//! subtract = { base_cost = 0.10, require_evaluation = true }
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the configuration file (default: `paylink.toml`)
//! - `HOST` - Override the bind address
//! - `PORT` - Override the port
//!
//! Payment settings (wallet service, evaluator, receiving wallet) come from
//! [`PaymentSettings`](paylink::PaymentSettings), not from this file.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use paylink::PolicyTable;
use paylink_http::constants::DEFAULT_WALLET_HEADER;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "paylink.toml";

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port (default: `8050`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request header carrying the payer wallet.
    #[serde(default = "default_wallet_header")]
    pub wallet_header: String,

    /// Tool prices. Tools not listed are free.
    #[serde(default)]
    pub policies: PolicyTable,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    8050
}

fn default_wallet_header() -> String {
    DEFAULT_WALLET_HEADER.to_owned()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            wallet_header: default_wallet_header(),
            policies: PolicyTable::new(),
        }
    }
}

impl ServerConfig {
    /// Loads `path`, then applies `HOST` / `PORT` from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed, or an override is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`ServerConfig::load`], reading overrides through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::load`].
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?
        } else {
            String::new()
        };
        Self::parse_with(&content, lookup)
    }

    /// Parses a TOML document and applies `HOST` / `PORT` from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML, invalid policies or a
    /// malformed override.
    pub fn parse_with<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content)?;

        if let Some(host) = lookup("HOST").filter(|v| !v.trim().is_empty()) {
            config.host = host
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { key: "HOST", value: host })?;
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { key: "PORT", value: port })?;
        }

        Ok(config)
    }

    /// Socket address to bind.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
