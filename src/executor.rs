//! Plan execution and row shaping.
//!
//! Every row becomes a map keyed by `table.column` for each projected
//! column, whether or not the query joins another table.

use std::collections::BTreeMap;

use rusqlite::types::ValueRef;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{Column, ColumnType};
use crate::coerce::Value;
use crate::database::ConnectionSource;
use crate::error::{Error, Result};
use crate::planner::QueryPlan;
use crate::sql::Dialect;

/// One result row, keyed by `table.column`.
pub type Row = BTreeMap<String, Value>;

/// Rows plus the descriptors of the projected columns, in projection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub columns: Vec<Column>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Runs plans on connections taken from a [`ConnectionSource`].
pub struct Executor<'a> {
    source: &'a dyn ConnectionSource,
}

impl<'a> Executor<'a> {
    pub fn new(source: &'a dyn ConnectionSource) -> Self {
        Self { source }
    }

    /// Execute `plan` on a fresh connection, closed before returning.
    pub fn execute(&self, plan: &QueryPlan) -> Result<QueryResult> {
        let sql = plan.to_sql(Dialect::Sqlite);
        debug!(%sql, "executing query");

        let conn = self.source.connect()?;
        let mut stmt = conn.prepare(&sql).map_err(Error::Query)?;
        let columns = plan.columns();

        let rows = stmt
            .query_map([], |row| {
                let mut shaped = Row::new();
                for (i, column) in columns.iter().enumerate() {
                    shaped.insert(column.qualified_name(), cell_value(row.get_ref(i)?, column));
                }
                Ok(shaped)
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(Error::Query)?;

        debug!(rows = rows.len(), "query returned");
        Ok(QueryResult {
            rows,
            columns: columns.to_vec(),
        })
    }
}

/// Convert a SQLite cell, reading integers in boolean columns as booleans.
fn cell_value(cell: ValueRef<'_>, column: &Column) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) if column.column_type == ColumnType::Boolean => Value::Bool(n != 0),
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}
