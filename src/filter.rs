//! Column filters.
//!
//! A [`Filter`] is built from caller input before the table is known and only
//! becomes a typed predicate once bound to a reflected [`Column`]:
//!
//! ```text
//! Filter { column: "age", kind: Gt, raw: "30" }
//!     │  bind(&Column)          (pure; InvalidValue on bad text)
//!     ▼
//! BoundFilter { column: people.age, kind: Gt, value: Scalar(Int(30)) }
//!     │  to_expr()
//!     ▼
//! "people"."age" > 30
//! ```

use std::fmt;
use std::str::FromStr;

use crate::catalog::Column;
use crate::coerce::{coerce, coerce_list, InvalidValue, Value};
use crate::error::Error;
use crate::sql::{table_col, Expr, ExprExt};

// =============================================================================
// Filter Kind
// =============================================================================

/// Comparison applied by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Lt,
    Lte,
    Eq,
    Neq,
    Gt,
    Gte,
    In,
    NotIn,
    Between,
    NotBetween,
}

impl FilterKind {
    pub const ALL: [FilterKind; 10] = [
        FilterKind::Lt,
        FilterKind::Lte,
        FilterKind::Eq,
        FilterKind::Neq,
        FilterKind::Gt,
        FilterKind::Gte,
        FilterKind::In,
        FilterKind::NotIn,
        FilterKind::Between,
        FilterKind::NotBetween,
    ];

    /// The short name used in requests (`lt`, `not_in`, `bt`...).
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Lt => "lt",
            FilterKind::Lte => "lte",
            FilterKind::Eq => "eq",
            FilterKind::Neq => "neq",
            FilterKind::Gt => "gt",
            FilterKind::Gte => "gte",
            FilterKind::In => "in",
            FilterKind::NotIn => "not_in",
            FilterKind::Between => "bt",
            FilterKind::NotBetween => "nbt",
        }
    }

    /// Whether the kind takes a `;`-separated list rather than one value.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            FilterKind::In | FilterKind::NotIn | FilterKind::Between | FilterKind::NotBetween
        )
    }

    /// Exact number of values required, if fixed.
    pub fn arity(&self) -> Option<usize> {
        match self {
            FilterKind::Between | FilterKind::NotBetween => Some(2),
            FilterKind::In | FilterKind::NotIn => None,
            _ => Some(1),
        }
    }
}

impl FromStr for FilterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = FilterKind::ALL.iter().map(|k| k.as_str()).collect();
                Error::InvalidFilterKind(format!(
                    "\"{}\" (expected one of: {})",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Filter Values
// =============================================================================

/// A typed filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Value),
    List(Vec<Value>),
}

impl FilterValue {
    fn len(&self) -> usize {
        self.values().len()
    }

    fn values(&self) -> &[Value] {
        match self {
            FilterValue::Scalar(value) => std::slice::from_ref(value),
            FilterValue::List(values) => values,
        }
    }
}

// =============================================================================
// Filter
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Raw(String),
    Typed(FilterValue),
}

/// An unbound filter on one column, as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    column_name: String,
    kind: FilterKind,
    operand: Operand,
}

impl Filter {
    /// Build a filter from request text.
    ///
    /// Fails with [`Error::InvalidFilterKind`] for an unknown `kind`; the
    /// value is only parsed when the filter is bound.
    pub fn new(column_name: &str, kind: &str, raw: &str) -> crate::error::Result<Self> {
        Ok(Self::raw(column_name, kind.parse()?, raw))
    }

    /// Build a filter from an already-parsed kind and request text.
    pub fn raw(column_name: &str, kind: FilterKind, raw: &str) -> Self {
        Self {
            column_name: column_name.into(),
            kind,
            operand: Operand::Raw(raw.into()),
        }
    }

    /// Build a filter with a pre-typed value, skipping coercion.
    pub fn with_value(column_name: &str, kind: FilterKind, value: FilterValue) -> Self {
        Self {
            column_name: column_name.into(),
            kind,
            operand: Operand::Typed(value),
        }
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// The caller text, if the filter was built from text.
    pub fn raw_value(&self) -> Option<&str> {
        match &self.operand {
            Operand::Raw(raw) => Some(raw),
            Operand::Typed(_) => None,
        }
    }

    /// Type the operand against `column`.
    ///
    /// List kinds split the text on `;`. Between kinds need exactly two
    /// values, used in the order given.
    pub fn bind(&self, column: &Column) -> Result<BoundFilter, InvalidValue> {
        let value = match &self.operand {
            Operand::Raw(raw) if self.kind.is_list() => FilterValue::List(coerce_list(raw, column)?),
            Operand::Raw(raw) => FilterValue::Scalar(coerce(raw, column)?),
            Operand::Typed(value) => value.clone(),
        };

        let shape_ok = match (&value, self.kind.is_list()) {
            (FilterValue::Scalar(_), false) => true,
            (FilterValue::List(values), true) => {
                !values.is_empty() && self.kind.arity().map_or(true, |n| n == values.len())
            }
            _ => false,
        };
        if !shape_ok {
            return Err(InvalidValue::new(
                column,
                self.raw_value().unwrap_or_default(),
                format!(
                    "'{}' filter cannot take {} value(s)",
                    self.kind,
                    value.len()
                ),
            ));
        }

        // Pre-typed values skip coercion, which is what rejects these
        if let Some(bad) = value
            .values()
            .iter()
            .find(|v| matches!(v, Value::Float(f) if !f.is_finite()))
        {
            return Err(InvalidValue::new(
                column,
                &bad.to_string(),
                "value is not a finite number",
            ));
        }

        Ok(BoundFilter {
            table: column.table.clone(),
            column: column.name.clone(),
            kind: self.kind,
            value,
        })
    }
}

// =============================================================================
// Bound Filter
// =============================================================================

/// A filter typed against its column, ready to render.
///
/// Only [`Filter::bind`] builds one, so the value shape always fits the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFilter {
    table: String,
    column: String,
    kind: FilterKind,
    value: FilterValue,
}

impl BoundFilter {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    /// The predicate for this filter, with the column qualified by table.
    pub fn to_expr(&self) -> Expr {
        let target = table_col(&self.table, &self.column);

        match (&self.value, self.kind) {
            (FilterValue::Scalar(v), FilterKind::Lt) => target.lt(v.to_expr()),
            (FilterValue::Scalar(v), FilterKind::Lte) => target.lte(v.to_expr()),
            (FilterValue::Scalar(v), FilterKind::Eq) => target.eq(v.to_expr()),
            (FilterValue::Scalar(v), FilterKind::Neq) => target.ne(v.to_expr()),
            (FilterValue::Scalar(v), FilterKind::Gt) => target.gt(v.to_expr()),
            (FilterValue::Scalar(v), FilterKind::Gte) => target.gte(v.to_expr()),
            (FilterValue::List(vs), FilterKind::In) => target.in_list(exprs(vs)),
            (FilterValue::List(vs), FilterKind::NotIn) => target.not_in_list(exprs(vs)),
            (FilterValue::List(vs), FilterKind::Between) => {
                target.between(vs[0].to_expr(), vs[1].to_expr())
            }
            (FilterValue::List(vs), FilterKind::NotBetween) => {
                target.not_between(vs[0].to_expr(), vs[1].to_expr())
            }
            // bind() guarantees the value shape matches the kind
            (value, kind) => unreachable!("{:?} filter bound to {:?}", kind, value),
        }
    }
}

fn exprs(values: &[Value]) -> Vec<Expr> {
    values.iter().map(Value::to_expr).collect()
}

// =============================================================================
// Filter Set
// =============================================================================

/// Filters grouped by column name, in the order columns were first added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    entries: Vec<(String, Vec<Filter>)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter under its column name.
    pub fn add(&mut self, filter: Filter) {
        match self
            .entries
            .iter_mut()
            .find(|(name, _)| name == filter.column_name())
        {
            Some((_, filters)) => filters.push(filter),
            None => self
                .entries
                .push((filter.column_name().to_string(), vec![filter])),
        }
    }

    pub fn get(&self, column_name: &str) -> Option<&[Filter]> {
        self.entries
            .iter()
            .find(|(name, _)| name == column_name)
            .map(|(_, filters)| filters.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Filter])> {
        self.entries
            .iter()
            .map(|(name, filters)| (name.as_str(), filters.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for filter in iter {
            set.add(filter);
        }
        set
    }
}
