//! Configuration module for the catalog sync service.
//!
//! Loads configuration from `config.toml` with environment variable overrides.

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AppError;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog_source: CatalogSourceConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
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
    PathBuf::from("./data/catalog.db")
}

/// Connection settings for the external catalog manager (Lidarr API v1)
#[derive(Clone, Deserialize)]
pub struct CatalogSourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Profiles and root folder used when onboarding a new artist
    #[serde(default = "default_profile_id")]
    pub quality_profile_id: i64,
    #[serde(default = "default_profile_id")]
    pub metadata_profile_id: i64,
    #[serde(default = "default_root_folder_path")]
    pub root_folder_path: String,
}

// Custom Debug implementation to avoid exposing api_key
impl std::fmt::Debug for CatalogSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSourceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("quality_profile_id", &self.quality_profile_id)
            .field("metadata_profile_id", &self.metadata_profile_id)
            .field("root_folder_path", &self.root_folder_path)
            .finish()
    }
}

impl Default for CatalogSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            quality_profile_id: default_profile_id(),
            metadata_profile_id: default_profile_id(),
            root_folder_path: default_root_folder_path(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8686/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_profile_id() -> i64 {
    1
}

fn default_root_folder_path() -> String {
    "/media".to_string()
}

/// Local media library layout
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
        }
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}

/// Reconciliation pass scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            run_on_startup: default_run_on_startup(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_run_on_startup() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` in current directory (optional)
    /// 3. Environment variables with `CATALOG_SYNC_` prefix
    ///
    /// Environment variables use double underscore for nesting:
    /// - `CATALOG_SYNC_SERVER__PORT=9000` sets `server.port`
    /// - `CATALOG_SYNC_CATALOG_SOURCE__API_KEY=...` sets `catalog_source.api_key`
    pub fn load() -> Result<Self, AppError> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from(config_path: &str) -> Result<Self, AppError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "./data/catalog.db")?
            .set_default("catalog_source.base_url", "http://localhost:8686/api/v1")?
            .set_default("catalog_source.timeout_secs", 30)?
            .set_default("media.root", "./media")?
            .set_default("sync.run_on_startup", true)?
            .set_default("sync.interval_secs", 30)?
            .add_source(File::with_name(config_path).required(false))
            // CATALOG_SYNC_SERVER__PORT=9000 -> server.port = 9000
            .add_source(
                Environment::with_prefix("CATALOG_SYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for required fields.
    fn validate(&self) -> Result<(), AppError> {
        if self.sync.interval_secs == 0 {
            return Err(AppError::BadRequest(
                "sync.interval_secs must be greater than zero".to_string(),
            ));
        }

        if self.catalog_source.timeout_secs == 0 {
            return Err(AppError::BadRequest(
                "catalog_source.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.catalog_source.api_key.is_none() {
            tracing::warn!("Catalog source API key not configured - requests will be rejected");
        }

        Ok(())
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::{IpAddr, Ipv4Addr, SocketAddr};
        let ip: IpAddr = self.server.host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid host '{}', using 0.0.0.0", self.server.host);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        });
        SocketAddr::new(ip, self.server.port)
    }
}
