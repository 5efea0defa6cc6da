//! Crate-wide error type.

use crate::coerce::InvalidValue;
use crate::config::ConfigError;

/// Errors surfaced by reflection, planning and execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to open database: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("Schema reflection failed: {0}")]
    Reflection(String),

    #[error("Table not found: {0}")]
    NotFound(String),

    #[error("Invalid join: {0}")]
    InvalidJoin(String),

    #[error("Invalid filter kind: {0}")]
    InvalidFilterKind(String),

    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),

    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Query failed: {0}")]
    Query(#[source] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a composer does with an entry it cannot use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Drop the entry and carry on without it.
    Lenient,
    /// Fail the whole request.
    Strict,
}
