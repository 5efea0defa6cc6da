//! Schema catalog.
//!
//! The catalog is built once by [`Catalog::reflect`] and is read-only after
//! that; a reload builds a new catalog and replaces the old one wholesale.
//!
//! # Lookup keys
//!
//! ```text
//! people            -> table `people` in the default (main) schema
//! archive.people    -> table `people` in the attached schema `archive`
//! people.name       -> column `name` of `people` (resolve_qualified)
//! ```

mod reflect;
mod types;

pub use types::{Column, ColumnType, ForeignKeyRef, Table, TableListing};

use std::collections::BTreeMap;

use tracing::info;

use crate::database::ConnectionSource;
use crate::error::{Error, Result};

/// Reflected tables, keyed by `name` or `schema.name`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, Table>,
}

impl Catalog {
    /// Reflect every schema, table, column and foreign key visible through
    /// `source`.
    ///
    /// Fails with [`Error::Connection`] if no connection can be opened and
    /// [`Error::Reflection`] if introspection fails.
    pub fn reflect(source: &dyn ConnectionSource) -> Result<Self> {
        let conn = source.connect()?;
        let catalog = Self::from_tables(reflect::reflect_tables(&conn)?);
        info!(tables = catalog.len(), "reflected schema catalog");
        Ok(catalog)
    }

    /// Build a catalog from already-described tables.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.key(), t)).collect(),
        }
    }

    /// Look up a table by `name` or `schema.name`.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Like [`Catalog::table`], failing with [`Error::NotFound`].
    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.table(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// All tables grouped by schema, `None` being the default schema.
    pub fn list_tables(&self) -> TableListing {
        let mut listing: BTreeMap<Option<String>, BTreeMap<String, Table>> = BTreeMap::new();
        for table in self.tables.values() {
            listing
                .entry(table.schema.clone())
                .or_default()
                .insert(table.name.clone(), table.clone());
        }
        TableListing(listing)
    }

    /// Resolve a `table.column` reference.
    ///
    /// Exactly two dot-separated parts are required; surrounding whitespace
    /// on each part is ignored.
    pub fn resolve_qualified(&self, qualified: &str) -> Option<&Column> {
        let mut parts = qualified.split('.');
        let (table, column) = match (parts.next(), parts.next(), parts.next()) {
            (Some(table), Some(column), None) => (table.trim(), column.trim()),
            _ => return None,
        };
        self.table(table)?.column(column)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
