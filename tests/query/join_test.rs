//! Joined queries against the fixture database.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{assert_valid_sql, Fixture, HOMELESS_FROM, PEOPLE};
use grice::coerce::Value;
use grice::config::QuerySettings;
use grice::error::{Error, ErrorPolicy};
use grice::filter::Filter;
use grice::join::{ColumnPair, TableJoin};
use grice::planner::{PageSize, Planner, QueryRequest};
use grice::sort::Sort;
use grice::sql::Dialect;
use grice::TableService;

fn service(fixture: &Fixture) -> TableService {
    TableService::new(Arc::new(fixture.source()), QuerySettings::default()).unwrap()
}

fn people_with_cities(join: TableJoin) -> QueryRequest {
    QueryRequest::new("people")
        .columns(&["id", "name", "cities.label"])
        .page_size(PageSize::Unlimited)
        .sort(Sort::asc("id"))
        .join(join)
}

fn city_join() -> Vec<ColumnPair> {
    vec![ColumnPair::new("city_id", "id")]
}

#[test]
fn test_inner_join_excludes_unmatched() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&people_with_cities(TableJoin::inner("cities", city_join())))
        .unwrap();

    assert_eq!(result.len(), (HOMELESS_FROM - 1) as usize);
    let first = &result.rows[0];
    assert_eq!(first["people.id"], Value::Int(1));
    assert_eq!(first["cities.label"], Value::Text("Lyon".into()));
    assert!(result
        .rows
        .iter()
        .all(|row| !row["cities.label"].is_null()));
}

#[test]
fn test_outer_join_keeps_unmatched() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&people_with_cities(TableJoin::outer("cities", city_join())))
        .unwrap();

    assert_eq!(result.len(), PEOPLE as usize);
    let last = &result.rows[PEOPLE as usize - 1];
    assert_eq!(last["people.id"], Value::Int(PEOPLE));
    assert_eq!(last["cities.label"], Value::Null);
}

#[test]
fn test_rows_only_carry_qualified_keys() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&people_with_cities(TableJoin::inner("cities", city_join())))
        .unwrap();

    let keys: Vec<&str> = result.rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, ["cities.label", "people.id", "people.name"]);
}

#[test]
fn test_default_projection_stays_on_primary_table() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &QueryRequest::new("people")
                .page_size(PageSize::Unlimited)
                .join(TableJoin::inner("cities", city_join())),
        )
        .unwrap();

    assert_eq!(result.len(), (HOMELESS_FROM - 1) as usize);
    assert!(result
        .columns
        .iter()
        .all(|column| column.table == "people"));
}

#[test]
fn test_join_with_filters_on_primary() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &people_with_cities(TableJoin::inner("cities", city_join()))
                .filter(Filter::new("id", "lte", "3").unwrap()),
        )
        .unwrap();

    let labels: Vec<&Value> = result.rows.iter().map(|row| &row["cities.label"]).collect();
    assert_eq!(
        labels,
        [
            &Value::Text("Lyon".into()),
            &Value::Text("Berlin".into()),
            &Value::Text("Paris".into()),
        ]
    );
}

#[test]
fn test_join_pairs_are_anded() {
    let fixture = Fixture::new();
    let join = TableJoin::outer(
        "cities",
        vec![
            ColumnPair::new("city_id", "id"),
            ColumnPair::new("age", "id"),
        ],
    );
    let result = service(&fixture)
        .query_table(&people_with_cities(join))
        .unwrap();

    // Nobody's age equals their own city id, so no row finds a match
    assert_eq!(result.len(), PEOPLE as usize);
    assert!(result.rows.iter().all(|row| row["cities.label"].is_null()));
}

#[test]
fn test_invalid_join_fails_request() {
    let fixture = Fixture::new();
    let service = service(&fixture);

    let err = service
        .query_table(&people_with_cities(TableJoin::inner("planets", city_join())))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidJoin(ref msg) if msg.contains("planets")));

    let err = service
        .query_table(&people_with_cities(TableJoin::inner(
            "cities",
            vec![ColumnPair::new("city_id", "code")],
        )))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidJoin(ref msg) if msg.contains("code")));
}

#[test]
fn test_lenient_join_policy_drops_join() {
    let fixture = Fixture::new();
    let service = service(&fixture);
    let plan = Planner::new(service.catalog())
        .with_join_policy(ErrorPolicy::Lenient)
        .plan(
            &QueryRequest::new("people").join(TableJoin::inner("planets", city_join())),
        )
        .unwrap()
        .unwrap();

    assert!(!plan.to_sql(Dialect::Sqlite).contains("JOIN"));
}

#[test]
fn test_join_into_attached_schema() {
    let fixture = Fixture::new();
    let service =
        TableService::new(Arc::new(fixture.source_with_archive()), QuerySettings::default())
            .unwrap();

    let result = service
        .query_table(
            &QueryRequest::new("people")
                .columns(&["id"])
                .join(TableJoin::inner(
                    "archive.people_old",
                    vec![ColumnPair::new("id", "id")],
                )),
        )
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.rows[0]["people.id"], Value::Int(1));
}

#[test]
fn test_explained_join_sql_parses() {
    let fixture = Fixture::new();
    let service = service(&fixture);
    let request = people_with_cities(TableJoin::outer("cities", city_join()))
        .filter(Filter::new("name", "in", "person01;person02").unwrap())
        .page_size(PageSize::Limited(5));

    for dialect in [Dialect::Sqlite, Dialect::Postgres, Dialect::MySql] {
        let sql = service.explain(&request, dialect).unwrap().unwrap();
        assert!(sql.contains("LEFT JOIN"), "{}", sql);
        assert_valid_sql(&sql, dialect);
    }
}
