//! Shared fixtures for the integration tests.
//!
//! Builds a small on-disk database in a temp directory:
//! 40 people, 4 cities (one with nobody in it), and an attachable
//! archive database.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use grice::database::{ConnectionSource, SqliteSource};
use rusqlite::{params, Connection};
use sqlparser::dialect::{MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use tempfile::TempDir;

use grice::sql::Dialect;

/// People with an id above this have no city.
pub const HOMELESS_FROM: i64 = 37;
pub const PEOPLE: i64 = 40;

const SCHEMA: &str = r#"
CREATE TABLE cities (
    id INTEGER PRIMARY KEY,
    label TEXT NOT NULL,
    country TEXT
);

CREATE TABLE people (
    id INTEGER PRIMARY KEY,
    name VARCHAR(40) NOT NULL,
    age INTEGER,
    score REAL,
    active BOOLEAN,
    born DATE,
    city_id INTEGER REFERENCES cities(id)
);

INSERT INTO cities (id, label, country) VALUES
    (1, 'Paris', 'FR'),
    (2, 'Lyon', 'FR'),
    (3, 'Berlin', 'DE'),
    (4, 'Oslo', 'NO');
"#;

const ARCHIVE_SCHEMA: &str = r#"
CREATE TABLE people_old (
    id INTEGER PRIMARY KEY,
    note TEXT
);

INSERT INTO people_old (id, note) VALUES (1, 'moved away');
"#;

/// A database fixture that lives as long as its temp directory.
pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
    pub archive: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.db");
        let archive = dir.path().join("archive.db");

        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        for id in 1..=PEOPLE {
            let city = (id < HOMELESS_FROM).then_some(id % 3 + 1);
            conn.execute(
                "INSERT INTO people (id, name, age, score, active, born, city_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    format!("person{:02}", id),
                    id,
                    id as f64 / 2.0,
                    id % 2 == 0,
                    format!("2000-01-{:02}", (id - 1) % 28 + 1),
                    city,
                ],
            )
            .unwrap();
        }

        Connection::open(&archive)
            .unwrap()
            .execute_batch(ARCHIVE_SCHEMA)
            .unwrap();

        Self { dir, path, archive }
    }

    pub fn source(&self) -> SqliteSource {
        SqliteSource::new(&self.path)
    }

    pub fn source_with_archive(&self) -> SqliteSource {
        self.source().attach("archive", &self.archive)
    }

    /// A writable connection for changing the schema under a running service.
    pub fn writer(&self) -> Connection {
        Connection::open(&self.path).unwrap()
    }

    /// TOML for this fixture, with `extra` appended.
    pub fn config(&self, extra: &str) -> String {
        format!(
            "[database]\npath = '{}'\n\n{}",
            self.path.display(),
            extra
        )
    }
}

/// Counts how many connections were opened.
pub struct CountingSource {
    inner: SqliteSource,
    opened: AtomicUsize,
}

impl CountingSource {
    pub fn new(inner: SqliteSource) -> Self {
        Self {
            inner,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ConnectionSource for CountingSource {
    fn connect(&self) -> grice::Result<Connection> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.inner.connect()
    }
}

/// Parse `sql` back with sqlparser, panicking with the SQL on failure.
pub fn assert_valid_sql(sql: &str, dialect: Dialect) {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser_dialect, sql) {
        panic!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql);
    }
}
