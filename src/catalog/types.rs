//! Reflected schema descriptors.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

// ============================================================================
// Column Type
// ============================================================================

/// Semantic type of a column, derived from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    String,
    Date,
    DateTime,
    Time,
    Blob,
}

impl ColumnType {
    /// Map a SQLite declared type (`VARCHAR(20)`, `BIGINT`, `DATETIME`...)
    /// to its semantic type.
    ///
    /// Mirrors SQLite's affinity rules, with booleans and temporal types
    /// split out since SQLite stores them as integers and text.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        let has = |needle: &str| upper.contains(needle);

        if upper.is_empty() {
            ColumnType::Blob
        } else if has("BOOL") {
            ColumnType::Boolean
        } else if has("DATETIME") || has("TIMESTAMP") {
            ColumnType::DateTime
        } else if has("DATE") {
            ColumnType::Date
        } else if has("TIME") {
            ColumnType::Time
        } else if has("INT") {
            ColumnType::Integer
        } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
            .iter()
            .any(|&n| has(n))
        {
            ColumnType::Float
        } else if has("CHAR") || has("CLOB") || has("TEXT") {
            ColumnType::String
        } else if has("BLOB") {
            ColumnType::Blob
        } else {
            ColumnType::String
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
            ColumnType::Blob => "blob",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Column
// ============================================================================

/// A foreign key target: referenced column and its table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyRef {
    pub name: String,
    pub table_name: String,
}

/// A reflected column. Serializes as the column descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub primary_key: bool,
    pub nullable: bool,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub foreign_keys: Vec<ForeignKeyRef>,
    pub table: String,
    /// Schema of the owning table; `None` is the default schema.
    #[serde(skip)]
    pub schema: Option<String>,
    /// Type as declared in the DDL.
    #[serde(skip)]
    pub declared_type: String,
}

impl Column {
    /// A nullable, non-key column with no foreign keys.
    pub fn new(table: &str, name: &str, declared_type: &str) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
            nullable: true,
            column_type: ColumnType::from_declared(declared_type),
            foreign_keys: Vec::new(),
            table: table.into(),
            schema: None,
            declared_type: declared_type.into(),
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn references(mut self, table_name: &str, column: &str) -> Self {
        self.foreign_keys.push(ForeignKeyRef {
            name: column.into(),
            table_name: table_name.into(),
        });
        self
    }

    /// Result-row key for this column: `table.column`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

// ============================================================================
// Table
// ============================================================================

/// A reflected table with its columns in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub schema: Option<String>,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: &str, schema: Option<&str>, columns: Vec<Column>) -> Self {
        let schema = schema.map(String::from);
        let columns = columns
            .into_iter()
            .map(|mut c| {
                c.table = name.into();
                c.schema = schema.clone();
                c
            })
            .collect();
        Self {
            name: name.into(),
            schema,
            columns,
        }
    }

    /// Look up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Catalog key: `name` in the default schema, `schema.name` otherwise.
    pub fn key(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

// ============================================================================
// Table Listing
// ============================================================================

/// Schema → table name → table, as returned by `Catalog::list_tables`.
///
/// The default schema is keyed by `None` and serializes as `"null"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableListing(pub BTreeMap<Option<String>, BTreeMap<String, Table>>);

impl Deref for TableListing {
    type Target = BTreeMap<Option<String>, BTreeMap<String, Table>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for TableListing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (schema, tables) in &self.0 {
            map.serialize_entry(schema.as_deref().unwrap_or("null"), tables)?;
        }
        map.end()
    }
}
