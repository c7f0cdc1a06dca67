//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present); command-line flags override them in `main.rs`.
//!
//! | Variable              | Default                    |
//! |-----------------------|----------------------------|
//! | `DATABASE_URL`        | `sqlite://transactions.db` |
//! | `PORT`                | `3001`                     |
//! | `MAX_UPLOAD_BYTES`    | `2097152` (2 MiB)          |
//! | `ALLOW_EXTRA_COLUMNS` | `false`                    |

use std::env;

use crate::error::ConfigError;
use crate::validation::HeaderPolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://transactions.db";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Server and pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Upload size cap, enforced at the HTTP boundary only
    pub max_upload_bytes: usize,
    pub header_policy: HeaderPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            header_policy: HeaderPolicy::Strict,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            config.database_url = url;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse_value("PORT", &port)?;
        }
        if let Some(max) = lookup("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_value("MAX_UPLOAD_BYTES", &max)?;
        }
        if let Some(flag) = lookup("ALLOW_EXTRA_COLUMNS") {
            if parse_flag("ALLOW_EXTRA_COLUMNS", &flag)? {
                config.header_policy = HeaderPolicy::AllowExtra;
            }
        }

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
