//! Configuration loading

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Minimum length of the session signing secret, in bytes
pub const MIN_SESSION_SECRET_LEN: usize = 32;

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
    pub bootstrap: BootstrapConfig,
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
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session tokens; there is no built-in default
    #[serde(default, skip_serializing)]
    pub session_secret: Option<String>,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
    /// Only send cookies over HTTPS
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_ttl_hours: default_session_ttl_hours(),
            secure_cookies: false,
            cleanup_interval_minutes: default_cleanup_interval_minutes(),
        }
    }
}

/// Initial admin account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default, skip_serializing)]
    pub admin_password: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_password: None,
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

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_database_url() -> String {
    "sqlite:./data/nervelle.db?mode=rwc".to_string()
}

fn default_session_ttl_hours() -> u32 {
    12
}

fn default_cleanup_interval_minutes() -> u64 {
    30
}

fn default_admin_username() -> String {
    "admin".to_string()
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

    /// The configured session secret, refusing to start without a strong one
    pub fn session_secret(&self) -> Result<&str> {
        let Some(secret) = self.auth.session_secret.as_deref() else {
            bail!("No session secret configured; set NERVELLE_SESSION_SECRET");
        };
        if secret.len() < MIN_SESSION_SECRET_LEN {
            bail!(
                "Session secret must be at least {} bytes (got {})",
                MIN_SESSION_SECRET_LEN,
                secret.len()
            );
        }
        Ok(secret)
    }

    /// Session lifetime
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.auth.session_ttl_hours.max(1)))
    }

    /// Parent directory of a file-backed SQLite URL, if any
    pub fn database_dir(&self) -> Option<&Path> {
        let path = self.database.url.strip_prefix("sqlite:")?;
        let path = path.split('?').next()?.trim_start_matches("//");
        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Path::new(path)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
    }
}
