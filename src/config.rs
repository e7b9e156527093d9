//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub outbox: OutboxConfig,
    pub connectivity: ConnectivityConfig,
    pub logging: LoggingConfig,
}

/// Remote backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the PHP API (e.g., "http://192.168.100.15/nomad_api")
    pub base_url: String,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Read timeout for JSON endpoints in seconds
    pub request_timeout_secs: u64,
    /// Read timeout for multipart uploads in seconds
    pub upload_timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Outbox configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    /// Directory holding image copies for posts composed offline
    pub dir: PathBuf,
}

/// How network availability is determined
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityMode {
    /// Open a TCP connection to the API host
    #[default]
    Probe,
    /// Always report online
    Online,
    /// Always report offline
    Offline,
}

/// Connectivity configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    #[serde(default)]
    pub mode: ConnectivityMode,
    /// Probe timeout in milliseconds
    pub probe_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (NOMAD__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("api.base_url", "http://10.0.2.2/nomad_api")?
            .set_default("api.connect_timeout_secs", 10)?
            .set_default("api.request_timeout_secs", 10)?
            .set_default("api.upload_timeout_secs", 30)?
            .set_default("api.user_agent", concat!("Nomad/", env!("CARGO_PKG_VERSION")))?
            .set_default("database.path", "data/nomad_offline.db")?
            .set_default("outbox.dir", "data/outbox")?
            .set_default("connectivity.mode", "probe")?
            .set_default("connectivity.probe_timeout_ms", 1500)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("NOMAD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        let base = url::Url::parse(&self.api.base_url)
            .map_err(|e| AppError::Config(format!("api.base_url is not a valid URL: {e}")))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(AppError::Config(
                "api.base_url must use http or https".to_string(),
            ));
        }
        if base.host_str().is_none() {
            return Err(AppError::Config("api.base_url must have a host".to_string()));
        }

        if self.api.connect_timeout_secs == 0
            || self.api.request_timeout_secs == 0
            || self.api.upload_timeout_secs == 0
        {
            return Err(AppError::Config(
                "api timeouts must be greater than 0".to_string(),
            ));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(AppError::Config("database.path must not be empty".to_string()));
        }
        if self.outbox.dir.as_os_str().is_empty() {
            return Err(AppError::Config("outbox.dir must not be empty".to_string()));
        }

        if self.connectivity.mode == ConnectivityMode::Probe
            && self.connectivity.probe_timeout_ms == 0
        {
            tracing::warn!("connectivity.probe_timeout_ms=0; every probe will report offline");
        }

        Ok(())
    }
}
