//! Join resolution.
//!
//! A join names one target table and the column pairs to equate. Unlike
//! filters and sorts, a bad join fails the request by default.

use tracing::warn;

use crate::catalog::{Catalog, Table};
use crate::error::{Error, ErrorPolicy, Result};
use crate::sql::{and_all, table_col, ExprExt, Join, JoinType, TableRef};

/// `primary.from_column = target.to_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPair {
    pub from_column: String,
    pub to_column: String,
}

impl ColumnPair {
    pub fn new(from_column: &str, to_column: &str) -> Self {
        Self {
            from_column: from_column.into(),
            to_column: to_column.into(),
        }
    }
}

/// A join request against a single target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableJoin {
    pub table_name: String,
    pub column_pairs: Vec<ColumnPair>,
    pub outer_join: bool,
}

impl TableJoin {
    /// An inner join on the given pairs.
    pub fn inner(table_name: &str, column_pairs: Vec<ColumnPair>) -> Self {
        Self {
            table_name: table_name.into(),
            column_pairs,
            outer_join: false,
        }
    }

    /// A left outer join on the given pairs.
    pub fn outer(table_name: &str, column_pairs: Vec<ColumnPair>) -> Self {
        Self {
            outer_join: true,
            ..Self::inner(table_name, column_pairs)
        }
    }
}

/// Validates a [`TableJoin`] against the catalog and builds the JOIN clause.
#[derive(Debug, Clone, Copy)]
pub struct JoinResolver {
    policy: ErrorPolicy,
}

impl Default for JoinResolver {
    /// Invalid joins are errors.
    fn default() -> Self {
        Self::new(ErrorPolicy::Strict)
    }
}

impl JoinResolver {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }

    /// Resolve `join` from `primary`.
    ///
    /// Returns `Ok(None)` only under [`ErrorPolicy::Lenient`], when the join
    /// is dropped.
    pub fn resolve(
        &self,
        catalog: &Catalog,
        primary: &Table,
        join: &TableJoin,
    ) -> Result<Option<Join>> {
        match build_join(catalog, primary, join) {
            Ok(resolved) => Ok(Some(resolved)),
            Err(reason) if self.policy == ErrorPolicy::Lenient => {
                warn!(table = %primary.name, target = %join.table_name, %reason, "dropping invalid join");
                Ok(None)
            }
            Err(reason) => Err(Error::InvalidJoin(reason)),
        }
    }
}

fn build_join(catalog: &Catalog, primary: &Table, join: &TableJoin) -> std::result::Result<Join, String> {
    let target = catalog
        .table(&join.table_name)
        .ok_or_else(|| format!("table \"{}\" does not exist", join.table_name))?;

    if join.column_pairs.is_empty() {
        return Err(format!("no columns given to join \"{}\" on", target.name));
    }

    let missing = |column: &str, table: &Table| {
        format!("\"{}\" is not a column on table \"{}\"", column, table.name)
    };

    let mut conditions = Vec::with_capacity(join.column_pairs.len());
    for pair in &join.column_pairs {
        let from = primary
            .column(&pair.from_column)
            .ok_or_else(|| missing(&pair.from_column, primary))?;
        let to = target
            .column(&pair.to_column)
            .ok_or_else(|| missing(&pair.to_column, target))?;
        conditions.push(table_col(&primary.name, &from.name).eq(table_col(&target.name, &to.name)));
    }

    let on = and_all(conditions).ok_or_else(|| "join has no conditions".to_string())?;

    Ok(Join {
        join_type: if join.outer_join {
            JoinType::Left
        } else {
            JoinType::Inner
        },
        table: TableRef::new(&target.name).with_optional_schema(target.schema.as_deref()),
        on,
    })
}
