//! Database connections.
//!
//! Every catalog reflection and every query acquires its own connection from
//! a [`ConnectionSource`] and drops it before returning, so no connection
//! outlives the call that opened it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use crate::config::{ConfigError, DatabaseSettings};
use crate::error::{Error, Result};

/// Something that can open a ready-to-query connection.
///
/// Implementations must be safe to call from several threads at once; each
/// call returns an independent connection.
pub trait ConnectionSource: Send + Sync {
    fn connect(&self) -> Result<Connection>;
}

/// Opens read-only connections to a SQLite file, with optional attached
/// databases exposed as extra schemas.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
    attachments: Vec<(String, PathBuf)>,
    busy_timeout: Duration,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            attachments: Vec::new(),
            busy_timeout: Duration::from_millis(5000),
        }
    }

    /// Build a source from the `[database]` settings.
    pub fn from_settings(settings: &DatabaseSettings) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            path: settings.resolved_path()?,
            attachments: settings.resolved_attachments()?,
            busy_timeout: settings.busy_timeout(),
        })
    }

    /// Attach another database file under `schema`.
    pub fn attach(mut self, schema: &str, path: impl Into<PathBuf>) -> Self {
        self.attachments.push((schema.into(), path.into()));
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConnectionSource for SqliteSource {
    fn connect(&self) -> Result<Connection> {
        let flags =
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags).map_err(Error::Connection)?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(Error::Connection)?;

        for (schema, path) in &self.attachments {
            conn.execute(
                "ATTACH DATABASE ?1 AS ?2",
                params![read_only_uri(path), schema],
            )
            .map_err(Error::Connection)?;
        }

        debug!(
            path = %self.path.display(),
            attached = self.attachments.len(),
            "opened connection"
        );
        Ok(conn)
    }
}

/// `file:` URI opening `path` read-only.
fn read_only_uri(path: &Path) -> String {
    let escaped = path
        .to_string_lossy()
        .replace('%', "%25")
        .replace('?', "%3f")
        .replace('#', "%23");
    format!("file:{}?mode=ro", escaped)
}
