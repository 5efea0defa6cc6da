//! Shared helper functions for SQL dialect implementations.
//!
//! Dialects compose these instead of repeating quoting and pagination rules.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: SQLite, Postgres
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with single quotes where backslash is also an escape (MySQL).
pub fn quote_string_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: Postgres
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: SQLite, MySQL (both store booleans as integers)
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// A LIMIT or OFFSET operand, clamped so it never wraps negative.
fn row_count(n: u64) -> Token {
    Token::LitInt(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Emit LIMIT ... OFFSET ... (standard SQL).
///
/// SQLite rejects OFFSET without LIMIT, so an offset on its own is emitted
/// as `LIMIT -1 OFFSET n`, which SQLite reads as "no limit". The planner
/// always sets both, so other dialects never see the bare form.
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    match (limit, offset) {
        (Some(lim), _) => {
            ts.push(Token::Limit).space().push(row_count(lim));
        }
        (None, Some(_)) => {
            ts.push(Token::Limit).space().push(Token::LitInt(-1));
        }
        (None, None) => {}
    }

    if let Some(off) = offset {
        ts.space().push(Token::Offset).space().push(row_count(off));
    }

    ts
}

/// Emit LIMIT ... OFFSET ..., with a bare OFFSET allowed.
/// Used by: Postgres
pub fn emit_limit_offset_postgres(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit).space().push(row_count(lim));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset)
            .space()
            .push(row_count(off));
    }

    ts
}
