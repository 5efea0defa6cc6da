//! WHERE clause composition.
//!
//! Filters on the same column are alternatives and are ORed; columns are
//! independent constraints and are ANDed, in the order the columns appear in
//! the [`FilterSet`]:
//!
//! ```text
//! { age: [gt 30, lt 18], status: [eq active] }
//!   => ("people"."age" > 30 OR "people"."age" < 18) AND "people"."status" = 'active'
//! ```

use tracing::debug;

use crate::catalog::Table;
use crate::error::{Error, ErrorPolicy, Result};
use crate::filter::FilterSet;
use crate::sql::{and_all, or_all, Expr, ExprExt};

/// Builds the WHERE predicate for one table.
#[derive(Debug, Clone, Copy)]
pub struct PredicateComposer {
    policy: ErrorPolicy,
}

impl Default for PredicateComposer {
    /// Unknown columns and unparseable values are dropped.
    fn default() -> Self {
        Self::new(ErrorPolicy::Lenient)
    }
}

impl PredicateComposer {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }

    /// Compose the predicate for `filters` against `table`.
    ///
    /// Returns `Ok(None)` when no filter survives.
    pub fn compose(&self, table: &Table, filters: &FilterSet) -> Result<Option<Expr>> {
        let mut clauses = Vec::new();

        for (column_name, column_filters) in filters.iter() {
            let Some(column) = table.column(column_name) else {
                if self.policy == ErrorPolicy::Strict {
                    return Err(Error::UnknownColumn {
                        table: table.name.clone(),
                        column: column_name.to_string(),
                    });
                }
                debug!(table = %table.name, column = %column_name, "dropping filters on unknown column");
                continue;
            };

            let mut predicates = Vec::with_capacity(column_filters.len());
            for filter in column_filters {
                match filter.bind(column) {
                    Ok(bound) => predicates.push(bound.to_expr()),
                    Err(invalid) if self.policy == ErrorPolicy::Strict => {
                        return Err(invalid.into())
                    }
                    Err(invalid) => {
                        debug!(kind = %filter.kind(), error = %invalid, "dropping invalid filter");
                    }
                }
            }

            let clause = match predicates.len() {
                0 => continue,
                1 => predicates.pop(),
                _ => or_all(predicates).map(|e| e.paren()),
            };
            clauses.extend(clause);
        }

        Ok(and_all(clauses))
    }
}
