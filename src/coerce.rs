//! Typed values and coercion of caller text into them.
//!
//! Caller input arrives as text; the column's [`ColumnType`] picks the parse.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};

use crate::catalog::{Column, ColumnType};
use crate::sql::{Expr, Literal};

/// Separator between the elements of a list-valued filter.
pub const LIST_SEPARATOR: char = ';';

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

// =============================================================================
// Value
// =============================================================================

/// A typed cell or filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Bytes(Vec<u8>),
}

impl Value {
    /// SQL literal for this value.
    ///
    /// Temporal values become ISO-8601 literals; bytes render as their
    /// base64 text since the builder has no blob literal.
    pub fn to_literal(&self) -> Literal {
        match self {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Int(n) => Literal::Int(*n),
            Value::Float(f) => Literal::Float(*f),
            Value::Text(s) => Literal::String(s.clone()),
            Value::Date(d) => Literal::Date(d.format(DATE_FORMAT).to_string()),
            Value::DateTime(dt) => Literal::Timestamp(dt.format(DATETIME_FORMAT).to_string()),
            Value::Time(t) => Literal::Time(t.format(TIME_FORMAT).to_string()),
            Value::Bytes(b) => Literal::String(STANDARD.encode(b)),
        }
    }

    pub fn to_expr(&self) -> Expr {
        Expr::Literal(self.to_literal())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Value::Bytes(b) => f.write_str(&STANDARD.encode(b)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(_) | Value::DateTime(_) | Value::Time(_) | Value::Bytes(_) => {
                serializer.collect_str(self)
            }
        }
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// Caller text that does not parse as its column's type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid value \"{value}\" for {expected} column {column}: {reason}")]
pub struct InvalidValue {
    /// Qualified column name (`table.column`).
    pub column: String,
    pub value: String,
    pub expected: ColumnType,
    pub reason: String,
}

impl InvalidValue {
    pub fn new(column: &Column, value: &str, reason: impl Into<String>) -> Self {
        Self {
            column: column.qualified_name(),
            value: value.into(),
            expected: column.column_type,
            reason: reason.into(),
        }
    }
}

/// Convert caller text to the type of `column`.
///
/// Booleans never fail: only a case-insensitive `"true"` is true.
pub fn coerce(raw: &str, column: &Column) -> Result<Value, InvalidValue> {
    let invalid = |reason: String| InvalidValue::new(column, raw, reason);

    match column.column_type {
        ColumnType::Boolean => Ok(Value::Bool(raw.eq_ignore_ascii_case("true"))),
        ColumnType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| invalid(e.to_string())),
        ColumnType::Float => {
            let parsed = raw
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(e.to_string()))?;
            if !parsed.is_finite() {
                return Err(invalid("value is not a finite number".into()));
            }
            Ok(Value::Float(parsed))
        }
        ColumnType::String => Ok(Value::Text(raw.to_string())),
        ColumnType::Date => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map(Value::Date)
            .map_err(|e| invalid(e.to_string())),
        ColumnType::DateTime => parse_datetime(raw.trim())
            .map(Value::DateTime)
            .map_err(|e| invalid(e.to_string())),
        ColumnType::Time => parse_time(raw.trim())
            .map(Value::Time)
            .map_err(|e| invalid(e.to_string())),
        ColumnType::Blob => Err(invalid("binary columns cannot be filtered by text".into())),
    }
}

/// Split `raw` on `;` and coerce every element; any failure fails the list.
pub fn coerce_list(raw: &str, column: &Column) -> Result<Vec<Value>, InvalidValue> {
    raw.split(LIST_SEPARATOR)
        .map(|part| coerce(part, column))
        .collect()
}

fn parse_datetime(s: &str) -> chrono::ParseResult<NaiveDateTime> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(s, DATETIME_FORMAT))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
}

fn parse_time(s: &str) -> chrono::ParseResult<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
}
