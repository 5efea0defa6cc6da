//! ORDER BY composition.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::catalog::Table;
use crate::error::{Error, ErrorPolicy, Result};
use crate::sql::{table_col, OrderByExpr};

/// Sort direction as requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    /// Parses `asc` or `desc`, ignoring case.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(format!("invalid sort direction \"{}\" (expected asc or desc)", s))
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column_name: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(column_name: &str) -> Self {
        Self {
            column_name: column_name.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column_name: &str) -> Self {
        Self {
            column_name: column_name.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Turns [`Sort`]s into ORDER BY terms, keeping caller order.
#[derive(Debug, Clone, Copy)]
pub struct SortComposer {
    policy: ErrorPolicy,
}

impl Default for SortComposer {
    /// Unknown columns are skipped.
    fn default() -> Self {
        Self::new(ErrorPolicy::Lenient)
    }
}

impl SortComposer {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }

    pub fn compose(&self, table: &Table, sorts: &[Sort]) -> Result<Vec<OrderByExpr>> {
        let mut terms = Vec::with_capacity(sorts.len());

        for sort in sorts {
            let Some(column) = table.column(&sort.column_name) else {
                if self.policy == ErrorPolicy::Strict {
                    return Err(Error::UnknownColumn {
                        table: table.name.clone(),
                        column: sort.column_name.clone(),
                    });
                }
                debug!(table = %table.name, column = %sort.column_name, "skipping sort on unknown column");
                continue;
            };

            let target = table_col(&table.name, &column.name);
            terms.push(match sort.direction {
                SortDirection::Asc => OrderByExpr::asc(target),
                SortDirection::Desc => OrderByExpr::desc(target),
            });
        }

        Ok(terms)
    }
}
