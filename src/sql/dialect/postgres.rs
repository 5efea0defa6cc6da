//! PostgreSQL SQL dialect.
//!
//! - ANSI identifier quoting (`"`)
//! - Native boolean type (true/false)
//! - Typed temporal literals (`DATE '...'`, `TIMESTAMP '...'`)

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_postgres(limit, offset)
    }
}
