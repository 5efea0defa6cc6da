//! SQL generation module.
//!
//! A small type-safe SQL builder used by the planner:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{and_all, or_all, table_col, BinaryOperator, Expr, ExprExt, Literal};
pub use query::{Join, JoinType, LimitOffset, OrderByExpr, Query, SortDir, TableRef};
pub use token::{Token, TokenStream};
