//! SQLite SQL dialect.
//!
//! SQLite differences from ANSI:
//! - Booleans are stored as integers (1/0)
//! - No DATE/TIMESTAMP/TIME types; temporal values are ISO-8601 text, so
//!   temporal literals are plain strings and compare lexically
//! - OFFSET requires a LIMIT (`LIMIT -1` means unbounded)

use super::helpers;
use super::SqlDialect;

/// SQLite SQL dialect. This is the dialect plans are executed with.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        self.quote_string(date)
    }

    fn format_timestamp_literal(&self, ts: &str) -> String {
        self.quote_string(ts)
    }

    fn format_time_literal(&self, time: &str) -> String {
        self.quote_string(time)
    }
}
