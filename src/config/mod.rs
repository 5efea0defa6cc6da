//! Configuration module for grice.
//!
//! Handles the TOML config file, environment variables, and settings.

mod settings;

pub use settings::{
    expand_env_vars, ConfigError, DatabaseSettings, QuerySettings, Settings, BUSY_TIMEOUT_ENV,
    DB_PATH_ENV, PAGE_SIZE_ENV,
};
