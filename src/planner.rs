//! Query planning.
//!
//! Turns a [`QueryRequest`] into a [`QueryPlan`] in a fixed sequence:
//!
//! ```text
//! resolve table ─▶ resolve projection ─▶ pagination ─▶ filters ─▶ sorts ─▶ join
//!      │                  │
//!  NotFound         empty: Ok(None), nothing to run
//! ```

use tracing::debug;

use crate::catalog::{Catalog, Column, Table};
use crate::error::{ErrorPolicy, Result};
use crate::filter::{Filter, FilterSet};
use crate::join::{JoinResolver, TableJoin};
use crate::predicate::PredicateComposer;
use crate::sort::{Sort, SortComposer};
use crate::sql::{table_col, Dialect, Query, TableRef};

/// Rows per page when a request does not say.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

// =============================================================================
// Request
// =============================================================================

/// Rows per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Limited(u64),
    /// Return every matching row; the page index is ignored.
    Unlimited,
}

impl PageSize {
    /// Map the signed boundary form, where `-1` means unlimited.
    ///
    /// Any other negative number is rejected.
    pub fn from_signed(n: i64) -> Option<Self> {
        match n {
            -1 => Some(PageSize::Unlimited),
            n if n >= 0 => Some(PageSize::Limited(n as u64)),
            _ => None,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::Limited(DEFAULT_PAGE_SIZE)
    }
}

/// One read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub table_name: String,
    /// Columns to return, plain or `table.column`; `None` means all of the
    /// table's own columns.
    pub columns: Option<Vec<String>>,
    pub page: u64,
    pub page_size: PageSize,
    pub filters: FilterSet,
    pub sorts: Vec<Sort>,
    pub join: Option<TableJoin>,
}

impl QueryRequest {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.into(),
            columns: None,
            page: 0,
            page_size: PageSize::default(),
            filters: FilterSet::new(),
            sorts: Vec::new(),
            join: None,
        }
    }

    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.add(filter);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn join(mut self, join: TableJoin) -> Self {
        self.join = Some(join);
        self
    }
}

// =============================================================================
// Plan
// =============================================================================

/// A ready-to-run query and the columns it returns, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    query: Query,
    columns: Vec<Column>,
}

impl QueryPlan {
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Projected columns; cell `i` of every row belongs to `columns()[i]`.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.query.to_sql(dialect)
    }
}

// =============================================================================
// Planner
// =============================================================================

/// Builds plans against one catalog.
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    catalog: &'a Catalog,
    predicates: PredicateComposer,
    sorts: SortComposer,
    joins: JoinResolver,
}

impl<'a> Planner<'a> {
    /// A planner with lenient filters and sorts and strict joins.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            predicates: PredicateComposer::default(),
            sorts: SortComposer::default(),
            joins: JoinResolver::default(),
        }
    }

    pub fn with_filter_policy(mut self, policy: ErrorPolicy) -> Self {
        self.predicates = PredicateComposer::new(policy);
        self
    }

    pub fn with_sort_policy(mut self, policy: ErrorPolicy) -> Self {
        self.sorts = SortComposer::new(policy);
        self
    }

    pub fn with_join_policy(mut self, policy: ErrorPolicy) -> Self {
        self.joins = JoinResolver::new(policy);
        self
    }

    /// Plan `request`.
    ///
    /// Returns `Ok(None)` when no projected column resolves, in which case
    /// there is nothing to execute.
    pub fn plan(&self, request: &QueryRequest) -> Result<Option<QueryPlan>> {
        let table = self.catalog.get_table(&request.table_name)?;

        let columns = self.resolve_projection(table, request.columns.as_deref());
        if columns.is_empty() {
            debug!(table = %table.name, "empty projection, nothing to query");
            return Ok(None);
        }

        let mut query = Query::new()
            .select(
                columns
                    .iter()
                    .map(|c| table_col(&c.table, &c.name))
                    .collect(),
            )
            .from(TableRef::new(&table.name).with_optional_schema(table.schema.as_deref()));

        if let PageSize::Limited(size) = request.page_size {
            // An offset past u64 is past every row; the dialect clamps it
            let offset = request.page.checked_mul(size).unwrap_or(u64::MAX);
            query = query.limit(size).offset(offset);
        }

        if let Some(predicate) = self.predicates.compose(table, &request.filters)? {
            query = query.filter(predicate);
        }

        query = query.order_by(self.sorts.compose(table, &request.sorts)?);

        if let Some(join) = &request.join {
            if let Some(resolved) = self.joins.resolve(self.catalog, table, join)? {
                query = query.join(resolved);
            }
        }

        debug!(table = %table.name, sql = %query, "planned query");
        Ok(Some(QueryPlan { query, columns }))
    }

    /// Resolve requested names to columns, dropping the ones that match
    /// nothing. Dotted names are looked up across the whole catalog.
    fn resolve_projection(&self, table: &Table, requested: Option<&[String]>) -> Vec<Column> {
        let Some(names) = requested else {
            return table.columns.clone();
        };

        names
            .iter()
            .filter_map(|name| {
                let column = if name.contains('.') {
                    self.catalog.resolve_qualified(name)
                } else {
                    table.column(name)
                };
                if column.is_none() {
                    debug!(table = %table.name, column = %name, "dropping unknown projected column");
                }
                column.cloned()
            })
            .collect()
    }
}
