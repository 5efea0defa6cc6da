//! End-to-end single-table queries: coercion, filters, sorts and paging.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{CountingSource, Fixture, PEOPLE};
use grice::coerce::Value;
use grice::config::QuerySettings;
use grice::error::{Error, ErrorPolicy};
use grice::executor::{Executor, QueryResult};
use grice::filter::{Filter, FilterKind, FilterValue};
use grice::planner::{PageSize, Planner, QueryRequest};
use grice::sort::Sort;
use grice::TableService;

fn service(fixture: &Fixture) -> TableService {
    TableService::new(Arc::new(fixture.source()), QuerySettings::default()).unwrap()
}

/// Every person, ordered by id.
fn all_people() -> QueryRequest {
    QueryRequest::new("people")
        .page_size(PageSize::Unlimited)
        .sort(Sort::asc("id"))
}

fn filter(column: &str, kind: &str, raw: &str) -> Filter {
    Filter::new(column, kind, raw).unwrap()
}

fn ids(result: &QueryResult) -> Vec<i64> {
    result
        .rows
        .iter()
        .map(|row| match row["people.id"] {
            Value::Int(id) => id,
            ref other => panic!("unexpected id {:?}", other),
        })
        .collect()
}

#[test]
fn test_default_query_returns_first_page() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&QueryRequest::new("people").sort(Sort::asc("id")))
        .unwrap();

    assert_eq!(result.len(), 40);
    assert_eq!(ids(&result)[..3], [1, 2, 3]);
    assert_eq!(result.columns.len(), 7);
}

#[test]
fn test_rows_keyed_by_qualified_name() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&all_people().filter(filter("id", "eq", "2")))
        .unwrap();

    let row = &result.rows[0];
    let keys: Vec<&str> = row.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "people.active",
            "people.age",
            "people.born",
            "people.city_id",
            "people.id",
            "people.name",
            "people.score",
        ]
    );
    assert_eq!(row["people.name"], Value::Text("person02".into()));
    assert_eq!(row["people.score"], Value::Float(1.0));
    assert_eq!(row["people.born"], Value::Text("2000-01-02".into()));
}

#[test]
fn test_boolean_cells() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&all_people().filter(filter("id", "in", "1;2")))
        .unwrap();

    assert_eq!(result.rows[0]["people.active"], Value::Bool(false));
    assert_eq!(result.rows[1]["people.active"], Value::Bool(true));
}

#[test]
fn test_uncoercible_value_drops_filter() {
    let fixture = Fixture::new();
    let service = service(&fixture);

    let unfiltered = service.query_table(&all_people()).unwrap();
    let dropped = service
        .query_table(&all_people().filter(filter("age", "eq", "abc")))
        .unwrap();
    assert_eq!(dropped, unfiltered);
    assert_eq!(dropped.len(), PEOPLE as usize);

    let matched = service
        .query_table(&all_people().filter(filter("age", "eq", "7")))
        .unwrap();
    assert_eq!(ids(&matched), [7]);
}

#[test]
fn test_unknown_filter_column_is_ignored() {
    let fixture = Fixture::new();
    let service = service(&fixture);

    let unfiltered = service.query_table(&all_people()).unwrap();
    let ignored = service
        .query_table(&all_people().filter(filter("height", "gt", "3")))
        .unwrap();
    assert_eq!(ignored, unfiltered);
}

#[test]
fn test_between_bounds_kept_in_order() {
    let fixture = Fixture::new();
    let service = service(&fixture);

    let inverted = service
        .query_table(&all_people().filter(filter("age", "bt", "10;5")))
        .unwrap();
    assert!(inverted.is_empty());

    let ordered = service
        .query_table(&all_people().filter(filter("age", "bt", "5;10")))
        .unwrap();
    assert_eq!(ids(&ordered), [5, 6, 7, 8, 9, 10]);

    let outside = service
        .query_table(&all_people().filter(filter("age", "nbt", "3;38")))
        .unwrap();
    assert_eq!(ids(&outside), [1, 2, 39, 40]);
}

#[test]
fn test_between_with_wrong_arity_is_dropped() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&all_people().filter(filter("age", "bt", "1;2;3")))
        .unwrap();

    assert_eq!(result.len(), PEOPLE as usize);
}

#[test]
fn test_same_column_filters_are_ored() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &all_people()
                .filter(filter("age", "eq", "3"))
                .filter(filter("age", "gte", "39")),
        )
        .unwrap();

    assert_eq!(ids(&result), [3, 39, 40]);
}

#[test]
fn test_different_columns_are_anded() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &all_people()
                .filter(filter("age", "eq", "3"))
                .filter(filter("age", "eq", "4"))
                .filter(filter("active", "eq", "true")),
        )
        .unwrap();

    assert_eq!(ids(&result), [4]);
}

#[test]
fn test_list_filters() {
    let fixture = Fixture::new();
    let service = service(&fixture);

    let within = service
        .query_table(&all_people().filter(filter("name", "in", "person05;person12;nobody")))
        .unwrap();
    assert_eq!(ids(&within), [5, 12]);

    let without = service
        .query_table(
            &all_people()
                .filter(filter("age", "lte", "5"))
                .filter(filter("id", "not_in", "1;2;3")),
        )
        .unwrap();
    assert_eq!(ids(&without), [4, 5]);

    // One bad element fails the whole list, so the filter is dropped
    let dropped = service
        .query_table(&all_people().filter(filter("age", "in", "1;x")))
        .unwrap();
    assert_eq!(dropped.len(), PEOPLE as usize);
}

#[test]
fn test_scalar_comparisons() {
    let fixture = Fixture::new();
    let service = service(&fixture);

    let check = |f: Filter, expected: &[i64]| {
        let result = service.query_table(&all_people().filter(f)).unwrap();
        assert_eq!(ids(&result), expected);
    };

    check(filter("age", "lt", "3"), &[1, 2]);
    check(filter("age", "gt", "38"), &[39, 40]);
    check(filter("score", "lte", "1.0"), &[1, 2]);
    check(filter("born", "gte", "2000-01-28"), &[28]);
    check(filter("name", "eq", "person10"), &[10]);
}

#[test]
fn test_neq_excludes_value() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &all_people()
                .filter(filter("age", "lte", "3"))
                .filter(filter("id", "neq", "2")),
        )
        .unwrap();

    assert_eq!(ids(&result), [1, 3]);
}

#[test]
fn test_prebuilt_filter_values() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&all_people().filter(Filter::with_value(
            "age",
            FilterKind::Between,
            FilterValue::List(vec![Value::Int(2), Value::Int(4)]),
        )))
        .unwrap();

    assert_eq!(ids(&result), [2, 3, 4]);
}

#[test]
fn test_sorting() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &QueryRequest::new("people")
                .page_size(PageSize::Limited(3))
                .sort(Sort::desc("active"))
                .sort(Sort::desc("age")),
        )
        .unwrap();

    assert_eq!(ids(&result), [40, 38, 36]);
}

#[test]
fn test_unlimited_page_size() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&all_people().page(3))
        .unwrap();

    assert_eq!(result.len(), PEOPLE as usize);
}

#[test]
fn test_page_offsets() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &QueryRequest::new("people")
                .sort(Sort::asc("id"))
                .page(2)
                .page_size(PageSize::Limited(10)),
        )
        .unwrap();

    assert_eq!(ids(&result), (21..=30).collect::<Vec<i64>>());
}

#[test]
fn test_page_past_end_is_empty() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(&QueryRequest::new("people").page(9).page_size(PageSize::Limited(10)))
        .unwrap();

    assert!(result.is_empty());
}

#[test]
fn test_huge_pages_do_not_wrap() {
    let fixture = Fixture::new();
    let service = service(&fixture);

    let far = service
        .query_table(
            &QueryRequest::new("people")
                .sort(Sort::asc("id"))
                .page(u64::MAX / 2)
                .page_size(PageSize::Limited(10)),
        )
        .unwrap();
    assert!(far.is_empty());

    let last = service
        .query_table(
            &QueryRequest::new("people")
                .page(1 << 62)
                .page_size(PageSize::Limited(2)),
        )
        .unwrap();
    assert!(last.is_empty());

    let everything = service
        .query_table(
            &QueryRequest::new("people")
                .sort(Sort::asc("id"))
                .page_size(PageSize::Limited(u64::MAX)),
        )
        .unwrap();
    assert_eq!(ids(&everything), (1..=PEOPLE).collect::<Vec<i64>>());

    let second = service
        .query_table(
            &QueryRequest::new("people")
                .page(1)
                .page_size(PageSize::Limited(u64::MAX)),
        )
        .unwrap();
    assert!(second.is_empty());
}

#[test]
fn test_projection() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &all_people()
                .columns(&["name", "people.age", "nonsense", "people.planet"])
                .filter(filter("id", "eq", "1")),
        )
        .unwrap();

    let names: Vec<String> = result.columns.iter().map(|c| c.qualified_name()).collect();
    assert_eq!(names, ["people.name", "people.age"]);
    assert_eq!(result.rows[0].len(), 2);
}

#[test]
fn test_empty_projection_skips_database() {
    let fixture = Fixture::new();
    let source = Arc::new(CountingSource::new(fixture.source()));
    let service = TableService::new(source.clone(), QuerySettings::default()).unwrap();
    let opened = source.opened();

    let result = service
        .query_table(&QueryRequest::new("people").columns(&["nonsense"]))
        .unwrap();
    assert_eq!(result, QueryResult::default());
    assert_eq!(source.opened(), opened);

    service.query_table(&QueryRequest::new("people")).unwrap();
    assert_eq!(source.opened(), opened + 1);
}

#[test]
fn test_missing_table() {
    let fixture = Fixture::new();
    let err = service(&fixture)
        .query_table(&QueryRequest::new("planets"))
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(name) if name == "planets"));
}

#[test]
fn test_strict_policies_surface_errors() {
    let fixture = Fixture::new();
    let service = service(&fixture);
    let planner = Planner::new(service.catalog())
        .with_filter_policy(ErrorPolicy::Strict)
        .with_sort_policy(ErrorPolicy::Strict);

    let err = planner
        .plan(&all_people().filter(filter("age", "eq", "abc")))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidValue(ref v) if v.column == "people.age"));

    let err = planner
        .plan(&QueryRequest::new("people").sort(Sort::asc("height")))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownColumn { .. }));

    let plan = planner.plan(&all_people()).unwrap().unwrap();
    let result = Executor::new(&fixture.source()).execute(&plan).unwrap();
    assert_eq!(result.len(), PEOPLE as usize);
}

#[test]
fn test_result_json_shape() {
    let fixture = Fixture::new();
    let result = service(&fixture)
        .query_table(
            &all_people()
                .columns(&["id", "active", "city_id"])
                .filter(filter("id", "eq", "38")),
        )
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(
        json["rows"],
        serde_json::json!([
            { "people.id": 38, "people.active": true, "people.city_id": null }
        ])
    );
    assert_eq!(json["columns"][1]["type"], "boolean");
}
