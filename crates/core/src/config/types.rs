use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("plugins.db")
}

/// Upstream catalog feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Catalog document URL (fetched once, then served from `cache`)
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Local file holding the raw upstream response
    #[serde(default = "default_cache_path")]
    pub cache: PathBuf,
    /// Request timeout in seconds (default: 15)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            cache: default_cache_path(),
            timeout: default_timeout(),
        }
    }
}

fn default_upstream_url() -> String {
    "https://plugins.deckbrew.xyz/plugins".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("plugins.json")
}

fn default_timeout() -> u64 {
    15
}

/// Curation API configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Shared secret expected in the `X-Plugin-Store-Token` header.
    /// When unset the curation endpoints answer 503.
    #[serde(default)]
    pub token: Option<String>,
}

impl AdminConfig {
    /// The configured token, treating an empty string as unset.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,
    pub admin: SanitizedAdminConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAdminConfig {
    pub token_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            upstream: config.upstream.clone(),
            admin: SanitizedAdminConfig {
                token_configured: config.admin.token().is_some(),
            },
        }
    }
}
