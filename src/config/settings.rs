//! TOML-based configuration for grice.
//!
//! Supports a config file (grice.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [database]
//! path = "${GRICE_DB}"
//! busy_timeout_ms = 5000
//!
//! [database.attach]
//! archive = "./data/archive.db"
//!
//! [query]
//! default_page_size = 50
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the database path for env-only configuration.
pub const DB_PATH_ENV: &str = "GRICE_DB_PATH";

/// Environment variable overriding the busy timeout, in milliseconds.
pub const BUSY_TIMEOUT_ENV: &str = "GRICE_BUSY_TIMEOUT_MS";

/// Environment variable overriding the default page size.
pub const PAGE_SIZE_ENV: &str = "GRICE_PAGE_SIZE";

/// Error type for configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required setting: {0}")]
    MissingField(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Database location and connection options.
    pub database: DatabaseSettings,

    /// Query defaults.
    pub query: QuerySettings,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file (supports ${ENV_VAR} expansion).
    pub path: Option<String>,

    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Extra databases attached under a schema name.
    pub attach: BTreeMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
            attach: BTreeMap::new(),
        }
    }
}

impl DatabaseSettings {
    /// Get the database path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigError> {
        let raw = self
            .path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or(ConfigError::MissingField("database.path"))?;
        Ok(PathBuf::from(expand_env_vars(raw)?))
    }

    /// Get the attached databases with environment variables expanded.
    pub fn resolved_attachments(&self) -> Result<Vec<(String, PathBuf)>, ConfigError> {
        self.attach
            .iter()
            .map(|(schema, path)| {
                if schema.eq_ignore_ascii_case("main") || schema.eq_ignore_ascii_case("temp") {
                    return Err(ConfigError::InvalidConfig(format!(
                        "cannot attach a database as reserved schema '{}'",
                        schema
                    )));
                }
                Ok((schema.clone(), PathBuf::from(expand_env_vars(path)?)))
            })
            .collect()
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Query defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Page size used when a request does not set one.
    pub default_page_size: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_page_size: 50,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse settings from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Build settings from environment variables only.
    ///
    /// Required:
    /// - `GRICE_DB_PATH`
    ///
    /// Optional:
    /// - `GRICE_BUSY_TIMEOUT_MS`
    /// - `GRICE_PAGE_SIZE`
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var(DB_PATH_ENV)
            .map_err(|_| ConfigError::MissingEnvVar(DB_PATH_ENV.to_string()))?;

        let mut settings = Settings::default();
        settings.database.path = Some(path);

        if let Some(timeout) = env_u64(BUSY_TIMEOUT_ENV)? {
            settings.database.busy_timeout_ms = timeout;
        }
        if let Some(page_size) = env_u64(PAGE_SIZE_ENV)? {
            settings.query.default_page_size = page_size;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path` if it exists, otherwise from the environment.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }
        if env::var_os(DB_PATH_ENV).is_some() {
            return Self::from_env();
        }
        Err(ConfigError::FileNotFound(path.to_path_buf()))
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.default_page_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "query.default_page_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidConfig(format!("{} is not a number: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| ConfigError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
