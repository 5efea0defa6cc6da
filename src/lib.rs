//! # Grice
//!
//! Read-only table browsing and querying over a reflected SQLite schema.
//!
//! ## Architecture
//!
//! Requests carry raw strings from an untrusted caller. Everything that
//! reaches SQL has been checked against the reflected catalog first:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              SQLite database (+ attached)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [catalog reflection]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Catalog (tables, columns, foreign keys)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [planner]
//! ┌─────────────────────────────────────────────────────────┐
//! │   projection · coercer · predicate / sort composers      │
//! │   join resolver · pagination                             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    SQL Query                             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │            Rows keyed by "table.column"                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`service::TableService`] ties the stages together.

pub mod catalog;
pub mod coerce;
pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod filter;
pub mod join;
pub mod planner;
pub mod predicate;
pub mod service;
pub mod sort;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{Catalog, Column, ColumnType, ForeignKeyRef, Table, TableListing};
    pub use crate::coerce::{coerce, coerce_list, InvalidValue, Value};
    pub use crate::config::Settings;
    pub use crate::database::{ConnectionSource, SqliteSource};
    pub use crate::error::{Error, ErrorPolicy, Result};
    pub use crate::executor::{Executor, QueryResult, Row};
    pub use crate::filter::{BoundFilter, Filter, FilterKind, FilterSet, FilterValue};
    pub use crate::join::{ColumnPair, JoinResolver, TableJoin};
    pub use crate::planner::{PageSize, Planner, QueryPlan, QueryRequest};
    pub use crate::predicate::PredicateComposer;
    pub use crate::service::TableService;
    pub use crate::sort::{Sort, SortComposer, SortDirection};
    pub use crate::sql::Dialect;
}

// Also export at crate root for convenience
pub use error::{Error, ErrorPolicy, Result};
pub use service::TableService;
