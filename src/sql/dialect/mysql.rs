//! MySQL SQL dialect.
//!
//! - Backtick identifier quoting (`` `name` ``)
//! - Backslash escapes inside string literals
//! - Boolean is TINYINT(1), rendered as 1/0
//! - LIMIT ... OFFSET ... for pagination

use super::helpers;
use super::SqlDialect;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_backslash(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }
}
