//! Transport and proxy configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, SearchError};

/// Timeouts and identity used by the HTTP transport.
///
/// Both timeouts are always set: a single unresponsive proxy must never stall
/// a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Whole-response timeout in seconds.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_response_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; relay-search/0.1)".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            response_timeout_secs: default_response_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// Rejects zero timeouts.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 || self.response_timeout_secs == 0 {
            return Err(SearchError::Configuration(
                "Connect and response timeouts must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Where the proxy pool is replenished from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ProxyMode {
    /// No proxies; requests go out directly.
    #[default]
    Direct,
    /// A local `host:port` list, read once.
    File { path: PathBuf },
    /// A scraped public proxy listing.
    Scrape {
        #[serde(default = "default_listing_url")]
        base_url: String,
    },
}

/// Public proxy listing scraped by default; the page number is appended.
pub const DEFAULT_LISTING_URL: &str = "http://www.hidemyass.com/proxy-list/";

fn default_listing_url() -> String {
    DEFAULT_LISTING_URL.to_string()
}

/// Top-level configuration for a [`ProxyManager`](crate::ProxyManager).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub proxy: ProxyMode,
}

impl ManagerConfig {
    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ManagerConfig = serde_json::from_str(json)
            .map_err(|e| SearchError::Configuration(format!("Invalid config: {}", e)))?;
        config.transport.validate()?;
        Ok(config)
    }
}
