//! SQLite schema reflection.
//!
//! Reads `pragma_database_list`, each schema's `sqlite_master`,
//! `pragma_table_info` and `pragma_foreign_key_list` into [`Table`]s.

use std::collections::HashMap;

use rusqlite::{params, Connection};
use tracing::debug;

use super::types::{Column, ForeignKeyRef, Table};
use crate::error::{Error, Result};
use crate::sql::{Dialect, SqlDialect};

/// Name SQLite gives the database a connection was opened on.
const MAIN_SCHEMA: &str = "main";

/// Reflect every table of every schema visible on `conn`.
///
/// The `main` schema is reported as `None`; `temp` is skipped.
pub(crate) fn reflect_tables(conn: &Connection) -> Result<Vec<Table>> {
    let mut tables = Vec::new();

    for schema in list_schemas(conn)? {
        let public_schema = (schema != MAIN_SCHEMA).then_some(schema.as_str());
        let names = list_table_names(conn, &schema)?;
        debug!(schema = %schema, tables = names.len(), "reflecting schema");

        let mut raw = Vec::with_capacity(names.len());
        for name in &names {
            raw.push((name.as_str(), read_columns(conn, &schema, name)?));
        }

        // Implicit foreign key targets resolve to the referenced table's key
        let primary_keys: HashMap<&str, Vec<String>> = raw
            .iter()
            .map(|(name, cols)| (*name, primary_key_columns(cols)))
            .collect();

        for (name, cols) in raw {
            let fks = read_foreign_keys(conn, &schema, name)?;
            let columns = cols
                .into_iter()
                .map(|raw_col| {
                    let mut column = raw_col.column;
                    column.foreign_keys = fks
                        .iter()
                        .filter(|fk| fk.from == column.name)
                        .map(|fk| ForeignKeyRef {
                            name: fk.target_column(&primary_keys),
                            table_name: fk.table.clone(),
                        })
                        .collect();
                    column
                })
                .collect();
            tables.push(Table::new(name, public_schema, columns));
        }
    }

    Ok(tables)
}

fn reflection_error(context: &str, err: rusqlite::Error) -> Error {
    Error::Reflection(format!("{}: {}", context, err))
}

fn list_schemas(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_database_list ORDER BY seq")
        .map_err(|e| reflection_error("database list", e))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| reflection_error("database list", e))?;
    Ok(names.into_iter().filter(|n| n != "temp").collect())
}

fn list_table_names(conn: &Connection, schema: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT name FROM {}.sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        Dialect::Sqlite.quote_identifier(schema)
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| reflection_error(schema, e))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| reflection_error(schema, e))?;
    Ok(names)
}

struct RawColumn {
    column: Column,
    /// 1-based position in the primary key, 0 when not part of it.
    pk_position: i64,
}

fn read_columns(conn: &Connection, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    let context = format!("{}.{}", schema, table);
    let mut stmt = conn
        .prepare(
            "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1, ?2) ORDER BY cid",
        )
        .map_err(|e| reflection_error(&context, e))?;
    let rows = stmt
        .query_map(params![table, schema], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                row.get::<_, bool>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| reflection_error(&context, e))?;

    let pk_count = rows.iter().filter(|(_, _, _, pk)| *pk > 0).count();

    Ok(rows
        .into_iter()
        .map(|(name, declared, not_null, pk)| {
            let mut column = Column::new(table, &name, &declared);
            column.primary_key = pk > 0;
            // A lone INTEGER PRIMARY KEY aliases the rowid and can never be NULL
            let rowid_alias = pk > 0 && pk_count == 1 && declared.eq_ignore_ascii_case("INTEGER");
            column.nullable = !not_null && !rowid_alias;
            RawColumn {
                column,
                pk_position: pk,
            }
        })
        .collect())
}

fn primary_key_columns(columns: &[RawColumn]) -> Vec<String> {
    let mut keyed: Vec<&RawColumn> = columns.iter().filter(|c| c.pk_position > 0).collect();
    keyed.sort_by_key(|c| c.pk_position);
    keyed.into_iter().map(|c| c.column.name.clone()).collect()
}

struct RawForeignKey {
    seq: usize,
    table: String,
    from: String,
    to: Option<String>,
}

impl RawForeignKey {
    /// Referenced column, falling back to the target's primary key column
    /// at the same position when the constraint names none.
    fn target_column(&self, primary_keys: &HashMap<&str, Vec<String>>) -> String {
        if let Some(to) = &self.to {
            return to.clone();
        }
        primary_keys
            .get(self.table.as_str())
            .and_then(|pk| pk.get(self.seq))
            .cloned()
            .unwrap_or_else(|| self.from.clone())
    }
}

fn read_foreign_keys(conn: &Connection, schema: &str, table: &str) -> Result<Vec<RawForeignKey>> {
    let context = format!("{}.{} foreign keys", schema, table);
    let mut stmt = conn
        .prepare(
            "SELECT seq, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1, ?2) \
             ORDER BY id, seq",
        )
        .map_err(|e| reflection_error(&context, e))?;
    let fks = stmt
        .query_map(params![table, schema], |row| {
            Ok(RawForeignKey {
                seq: row.get::<_, i64>(0)?.max(0) as usize,
                table: row.get(1)?,
                from: row.get(2)?,
                to: row.get(3)?,
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| reflection_error(&context, e))?;
    Ok(fks)
}
