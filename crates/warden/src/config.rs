//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use warden_auth::MAX_TOKEN_TTL_HOURS;
use warden_db::StoreTimeouts;

/// Placeholder secret shipped in the defaults; never use it in production
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_ttl_hours")]
    pub access_token_ttl_hours: i64,
    #[serde(default = "default_refresh_token_ttl_hours")]
    pub refresh_token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_ttl_hours: default_access_token_ttl_hours(),
            refresh_token_ttl_hours: default_refresh_token_ttl_hours(),
        }
    }
}

impl AuthConfig {
    pub fn access_ttl(&self) -> Result<chrono::Duration> {
        ttl_hours("access_token_ttl_hours", self.access_token_ttl_hours)
    }

    pub fn refresh_ttl(&self) -> Result<chrono::Duration> {
        ttl_hours("refresh_token_ttl_hours", self.refresh_token_ttl_hours)
    }
}

fn ttl_hours(field: &str, hours: i64) -> Result<chrono::Duration> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        anyhow::bail!(
            "auth.{} must be between 1 and {} hours",
            field,
            MAX_TOKEN_TTL_HOURS
        );
    }
    chrono::Duration::try_hours(hours)
        .with_context(|| format!("auth.{} is out of range", field))
}

/// Per-call store time limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            write_timeout_secs: default_write_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn timeouts(&self) -> StoreTimeouts {
        StoreTimeouts {
            write: Duration::from_secs(self.write_timeout_secs),
            read: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "./data/warden.db".to_string()
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_access_token_ttl_hours() -> i64 {
    24
}

fn default_refresh_token_ttl_hours() -> i64 {
    168
}

fn default_write_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        // Check if config file exists
        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            anyhow::bail!("auth.jwt_secret must not be empty");
        }
        if self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("auth.jwt_secret is the built-in default; set WARDEN_JWT_SECRET before deploying");
        }
        self.auth.access_ttl()?;
        self.auth.refresh_ttl()?;
        if self.store.write_timeout_secs == 0 || self.store.read_timeout_secs == 0 {
            anyhow::bail!("store timeouts must be positive");
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => anyhow::bail!("unknown logging.format '{}'", other),
        }
    }
}
