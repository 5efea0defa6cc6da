//! Schema reflection against a real database file.

#[path = "../common/mod.rs"]
mod common;

use common::Fixture;
use grice::catalog::{Catalog, ColumnType, ForeignKeyRef};
use grice::Error;

#[test]
fn test_reflects_main_tables() {
    let fixture = Fixture::new();
    let catalog = Catalog::reflect(&fixture.source()).unwrap();

    let keys: Vec<String> = catalog.tables().map(|t| t.key()).collect();
    assert_eq!(keys, ["cities", "people"]);
}

#[test]
fn test_column_types() {
    let fixture = Fixture::new();
    let catalog = Catalog::reflect(&fixture.source()).unwrap();
    let people = catalog.get_table("people").unwrap();

    let types: Vec<(&str, ColumnType)> = people
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.column_type))
        .collect();
    assert_eq!(
        types,
        [
            ("id", ColumnType::Integer),
            ("name", ColumnType::String),
            ("age", ColumnType::Integer),
            ("score", ColumnType::Float),
            ("active", ColumnType::Boolean),
            ("born", ColumnType::Date),
            ("city_id", ColumnType::Integer),
        ]
    );
}

#[test]
fn test_keys_and_nullability() {
    let fixture = Fixture::new();
    let catalog = Catalog::reflect(&fixture.source()).unwrap();
    let people = catalog.get_table("people").unwrap();

    let id = people.column("id").unwrap();
    assert!(id.primary_key);
    assert!(!id.nullable, "rowid alias can never be null");

    assert!(!people.column("name").unwrap().nullable);
    assert!(people.column("age").unwrap().nullable);
    assert!(!people.column("age").unwrap().primary_key);
}

#[test]
fn test_foreign_keys() {
    let fixture = Fixture::new();
    let catalog = Catalog::reflect(&fixture.source()).unwrap();
    let people = catalog.get_table("people").unwrap();

    assert_eq!(
        people.column("city_id").unwrap().foreign_keys,
        vec![ForeignKeyRef {
            name: "id".into(),
            table_name: "cities".into(),
        }]
    );
    assert!(people.column("age").unwrap().foreign_keys.is_empty());
}

#[test]
fn test_attached_schema() {
    let fixture = Fixture::new();
    let catalog = Catalog::reflect(&fixture.source_with_archive()).unwrap();

    let old = catalog.get_table("archive.people_old").unwrap();
    assert_eq!(old.schema.as_deref(), Some("archive"));
    assert_eq!(old.column("note").unwrap().schema.as_deref(), Some("archive"));

    let listing = catalog.list_tables();
    let main: Option<String> = None;
    let archive = Some("archive".to_string());
    assert!(listing[&main].contains_key("people"));
    assert!(listing[&archive].contains_key("people_old"));
}

#[test]
fn test_listing_round_trips_through_get_table() {
    let fixture = Fixture::new();
    let catalog = Catalog::reflect(&fixture.source_with_archive()).unwrap();

    for (schema, tables) in catalog.list_tables().iter() {
        for (name, table) in tables {
            let key = match schema {
                Some(schema) => format!("{}.{}", schema, name),
                None => name.clone(),
            };
            assert_eq!(catalog.get_table(&key).unwrap(), table);
        }
    }
}

#[test]
fn test_missing_table() {
    let fixture = Fixture::new();
    let catalog = Catalog::reflect(&fixture.source()).unwrap();

    assert!(matches!(catalog.get_table("planets"), Err(Error::NotFound(_))));
}

#[test]
fn test_listing_json_shape() {
    let fixture = Fixture::new();
    let catalog = Catalog::reflect(&fixture.source_with_archive()).unwrap();
    let json = serde_json::to_value(catalog.list_tables()).unwrap();

    let city_id = &json["null"]["people"]["columns"][6];
    assert_eq!(
        *city_id,
        serde_json::json!({
            "name": "city_id",
            "primary_key": false,
            "nullable": true,
            "type": "integer",
            "foreign_keys": [{ "name": "id", "table_name": "cities" }],
            "table": "people",
        })
    );
    assert_eq!(json["null"]["people"]["schema"], serde_json::Value::Null);
    assert_eq!(json["archive"]["people_old"]["schema"], "archive");
    assert_eq!(json["archive"]["people_old"]["name"], "people_old");
}

#[test]
fn test_missing_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = grice::database::SqliteSource::new(dir.path().join("absent.db"));

    assert!(matches!(Catalog::reflect(&source), Err(Error::Connection(_))));
}
