//! Configuration loading for the API binary.
//!
//! # Configuration Sources (in order of priority, lowest to highest)
//!
//! 1. Default values (from `#[serde(default)]` attributes)
//! 2. TOML config file (`SWITCHBOARD_CONFIG`, or `switchboard.toml` if present)
//! 3. Environment variables (prefix: `SWITCHBOARD_`, nested with `__`)
//!
//! - `SWITCHBOARD_LISTEN_ADDR` → `listen_addr`
//! - `SWITCHBOARD_DATABASE__URL` → `database.url`
//! - `SWITCHBOARD_SESSION__SECURE_COOKIE` → `session.secure_cookie`
//! - `SWITCHBOARD_LOG__FORMAT` → `log.format`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

use switchboard_auth::SESSION_TTL_HOURS;
use switchboard_observability::LogSettings;

pub const ENV_PREFIX: &str = "SWITCHBOARD_";
pub const DEFAULT_CONFIG_FILE: &str = "switchboard.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Add `Secure` to the session cookie (serve over HTTPS).
    #[serde(default)]
    pub secure_cookie: bool,
}

/// One year.
pub const MAX_TTL_HOURS: i64 = 24 * 366;

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite://switchboard.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_ttl_hours() -> i64 {
    SESSION_TTL_HOURS
}

fn default_cookie_name() -> String {
    "switchboard_session".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            cookie_name: default_cookie_name(),
            secure_cookie: false,
        }
    }
}

impl AppConfig {
    /// Load from the configured TOML file (if it exists) and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(format!("{ENV_PREFIX}CONFIG"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut figment = Figment::new();
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(figment)
            .with_context(|| format!("failed to load config from {} and environment", path.display()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        if config.session.ttl_hours <= 0 {
            anyhow::bail!("session.ttl_hours must be positive");
        }
        if config.session.ttl_hours > MAX_TTL_HOURS {
            anyhow::bail!("session.ttl_hours cannot exceed {MAX_TTL_HOURS}");
        }
        if config.session.cookie_name.trim().is_empty() {
            anyhow::bail!("session.cookie_name cannot be empty");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_observability::LogFormat;

    fn parse(toml: &str) -> Result<AppConfig> {
        AppConfig::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.session.ttl_hours, 12);
        assert_eq!(config.session.cookie_name, "switchboard_session");
        assert!(!config.session.secure_cookie);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn nested_values_override_defaults() {
        let config = parse(
            r#"
            listen_addr = "127.0.0.1:9000"

            [database]
            url = "sqlite://data/console.db?mode=rwc"

            [session]
            ttl_hours = 1
            secure_cookie = true

            [log]
            format = "pretty"
            filter = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.database.url, "sqlite://data/console.db?mode=rwc");
        assert_eq!(config.session.ttl_hours, 1);
        assert!(config.session.secure_cookie);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.filter, "debug");
    }

    #[test]
    fn rejects_non_positive_ttl() {
        assert!(parse("[session]\nttl_hours = 0").is_err());
    }

    #[test]
    fn rejects_out_of_range_ttl() {
        assert!(parse("[session]\nttl_hours = 9223372036854775807").is_err());
        assert!(parse("[session]\nttl_hours = 8785").is_err());
        let config = parse("[session]\nttl_hours = 8784").unwrap();
        assert_eq!(config.session.ttl_hours, MAX_TTL_HOURS);
    }
}
