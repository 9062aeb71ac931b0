//! Normalization and dataset tests

use super::*;
use crate::error::Error;
use crate::schema::ScalarKind;
use crate::types::{ColumnMap, Record, Value};
use chrono::{Days, NaiveDate};
use pretty_assertions::assert_eq;
use serde_json::json;

fn day(offset: u64) -> Value {
    Value::DateTime(
        NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    )
}

fn sample_columns() -> ColumnMap {
    let mut columns = ColumnMap::new();
    columns.insert(
        "strings".to_string(),
        vec!["hi".into(), "world".into(), "bye".into(), "school".into()],
    );
    columns.insert(
        "ints".to_string(),
        vec![1.into(), 2.into(), 3.into(), 4.into()],
    );
    columns.insert(
        "floats".to_string(),
        vec![1.1.into(), 2.2.into(), 3.3.into(), 4.4444.into()],
    );
    columns.insert("dates".to_string(), (0..4).map(day).collect());
    columns
}

fn sample_rows() -> Vec<Record> {
    let strings = ["hi", "world", "bye", "school"];
    let floats = [1.1, 2.2, 3.3, 4.4444];
    (0..4)
        .map(|i| {
            let mut row = Record::new();
            row.insert("strings".to_string(), strings[i].into());
            row.insert("ints".to_string(), Value::Integer(i as i64 + 1));
            row.insert("floats".to_string(), floats[i].into());
            row.insert("dates".to_string(), day(i as u64));
            row
        })
        .collect()
}

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

// ============================================================================
// Normalization Tests
// ============================================================================

#[test]
fn test_column_input_passes_through() {
    let columns = sample_columns();
    let normalized = normalize(columns.clone().into(), &NormalizeOptions::new()).unwrap();
    assert_eq!(normalized, columns);
}

#[test]
fn test_rows_pivot_to_columns() {
    let normalized = normalize(sample_rows().into(), &NormalizeOptions::new()).unwrap();
    assert_eq!(normalized, sample_columns());
}

#[test]
fn test_row_key_order_does_not_matter() {
    let rows = vec![
        record(&[("a", 1.into()), ("b", 2.into())]),
        record(&[("b", 4.into()), ("a", 3.into())]),
    ];
    let columns = normalize(rows.into(), &NormalizeOptions::new()).unwrap();
    assert_eq!(columns["a"], vec![Value::Integer(1), Value::Integer(3)]);
    assert_eq!(columns["b"], vec![Value::Integer(2), Value::Integer(4)]);
}

#[test]
fn test_mismatched_rows_fail() {
    let rows = vec![
        record(&[("a", 1.into()), ("b", 2.into())]),
        record(&[("a", 1.into())]),
    ];
    let err = normalize(rows.into(), &NormalizeOptions::new()).unwrap_err();
    match err {
        Error::SchemaMismatch {
            row,
            expected,
            found,
        } => {
            assert_eq!(row, 1);
            assert_eq!(expected, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(found, vec!["a".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_same_size_different_keys_fail() {
    let rows = vec![record(&[("a", 1.into())]), record(&[("b", 1.into())])];
    assert!(matches!(
        normalize(rows.into(), &NormalizeOptions::new()),
        Err(Error::SchemaMismatch { row: 1, .. })
    ));
}

#[test]
fn test_validate_lengths_reports_every_column() {
    let mut columns = ColumnMap::new();
    columns.insert("a".to_string(), vec![1.into(), 2.into()]);
    columns.insert("b".to_string(), vec![1.into()]);

    let options = NormalizeOptions::new().with_validate_lengths(true);
    let err = normalize(columns.clone().into(), &options).unwrap_err();
    match err {
        Error::LengthMismatch { lengths } => {
            assert_eq!(
                lengths,
                vec![("a".to_string(), 2), ("b".to_string(), 1)]
            );
        }
        other => panic!("unexpected error: {other}"),
    }

    // Without validation, asymmetric columns are accepted
    assert!(normalize(columns.into(), &NormalizeOptions::new()).is_ok());
}

#[test]
fn test_from_json_shapes() {
    let columns = RawDataset::from_json(json!({"b": [1, 2], "a": ["x", null]})).unwrap();
    let RawDataset::Columns(columns) = columns else {
        panic!("expected column-oriented data");
    };
    let names: Vec<&str> = columns.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["b", "a"]);

    let rows = RawDataset::from_json(json!([{"a": 1}, {"a": 2}])).unwrap();
    assert!(matches!(rows, RawDataset::Rows(ref r) if r.len() == 2));

    assert!(matches!(
        RawDataset::from_json(json!({"a": 1})),
        Err(Error::InvalidInput { .. })
    ));
    assert!(matches!(
        RawDataset::from_json(json!([1, 2])),
        Err(Error::InvalidInput { .. })
    ));
    assert!(matches!(
        RawDataset::from_json(json!("text")),
        Err(Error::InvalidInput { .. })
    ));
}

// ============================================================================
// Dataset Tests
// ============================================================================

#[test]
fn test_integers_beyond_i64_are_not_merged() {
    let data = Dataset::from_json(
        json!({"ids": [18_446_744_073_709_551_615_u64, 18_446_744_073_709_551_614_u64]}),
        &NormalizeOptions::new(),
    )
    .unwrap();

    assert_eq!(data.column_kinds().unwrap()["ids"], ScalarKind::String);
    let records = data.records().unwrap();
    assert_eq!(records[0]["ids"], Value::from("18446744073709551615"));
    assert_eq!(records[1]["ids"], Value::from("18446744073709551614"));
}

#[test]
fn test_column_kinds_for_both_shapes() {
    for data in [
        Dataset::new(sample_columns()).unwrap(),
        Dataset::new(sample_rows()).unwrap(),
    ] {
        let kinds = data.column_kinds().unwrap();
        assert_eq!(kinds["strings"], ScalarKind::String);
        assert_eq!(kinds["ints"], ScalarKind::Integer);
        assert_eq!(kinds["floats"], ScalarKind::Float);
        assert_eq!(kinds["dates"], ScalarKind::DateTime);
    }
}

#[test]
fn test_records_for_both_shapes() {
    for data in [
        Dataset::new(sample_columns()).unwrap(),
        Dataset::new(sample_rows()).unwrap(),
    ] {
        let records = data.records().unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records, sample_rows());
    }
}

#[test]
fn test_end_to_end_records_skip_null_columns() {
    let data = Dataset::from_json(
        json!({
            "strings": ["hi", "world"],
            "ints": [1, 2],
            "floats": [1.1, 2.2],
            "nils": [null, null]
        }),
        &NormalizeOptions::new(),
    )
    .unwrap();

    let kinds = data.column_kinds().unwrap();
    assert_eq!(kinds["nils"], ScalarKind::Null);

    let records = data.records().unwrap();
    assert_eq!(
        records,
        vec![
            record(&[
                ("strings", "hi".into()),
                ("ints", 1.into()),
                ("floats", 1.1.into())
            ]),
            record(&[
                ("strings", "world".into()),
                ("ints", 2.into()),
                ("floats", 2.2.into())
            ]),
        ]
    );
}

#[test]
fn test_records_coerce_mixed_columns() {
    let mut columns = ColumnMap::new();
    columns.insert(
        "int_float".to_string(),
        vec![1.into(), 2.into(), 1.1.into(), 2.2.into()],
    );
    columns.insert(
        "int_float_string".to_string(),
        vec![1.into(), 1.1.into(), "1.1".into(), "2.2cm".into()],
    );
    let records = Dataset::new(columns).unwrap().records().unwrap();

    assert_eq!(records[0]["int_float"], Value::Float(1.0));
    assert_eq!(records[0]["int_float_string"], Value::from("1"));
    assert_eq!(records[3]["int_float_string"], Value::from("2.2cm"));
}

#[test]
fn test_records_require_equal_lengths() {
    let mut columns = ColumnMap::new();
    columns.insert("a".to_string(), vec![1.into(), 2.into()]);
    columns.insert("b".to_string(), vec![1.into()]);
    let data = Dataset::new(columns).unwrap();
    assert!(matches!(
        data.records(),
        Err(Error::LengthMismatch { .. })
    ));
}

#[test]
fn test_records_name_the_failing_column() {
    let mut kinds = indexmap::IndexMap::new();
    kinds.insert("a".to_string(), ScalarKind::Integer);
    let mut columns = ColumnMap::new();
    columns.insert("a".to_string(), vec![1.into(), 2.5.into()]);

    let err = Dataset::new(columns)
        .unwrap()
        .records_as(&kinds, &crate::coerce::Coercer::new())
        .unwrap_err();
    assert!(matches!(err, Error::InColumn { ref column, .. } if column == "a"));
    assert!(matches!(err.root(), Error::Coercion { index: 1, .. }));
}

#[test]
fn test_row_count_is_longest_column() {
    let mut columns = ColumnMap::new();
    columns.insert("short".to_string(), vec![1.into()]);
    columns.insert("long".to_string(), vec![1.into(), 2.into(), 3.into()]);
    columns.insert("empty".to_string(), vec![]);
    let data = Dataset::new(columns).unwrap();
    assert_eq!(data.row_count().unwrap(), 3);
}

#[test]
fn test_row_count_of_empty_dataset_fails() {
    let mut columns = ColumnMap::new();
    columns.insert("a".to_string(), vec![]);
    assert!(matches!(
        Dataset::new(columns).unwrap().row_count(),
        Err(Error::EmptyDataset)
    ));
    assert!(matches!(
        Dataset::new(Vec::<Record>::new()).unwrap().row_count(),
        Err(Error::EmptyDataset)
    ));
}

#[test]
fn test_fill_equalizes_and_is_idempotent() {
    let mut columns = ColumnMap::new();
    columns.insert("a".to_string(), vec![1.into(), 2.into(), 3.into()]);
    columns.insert("b".to_string(), vec![1.into()]);
    let mut data = Dataset::new(columns).unwrap();

    assert_eq!(data.fill("b", Value::Null).unwrap(), 2);
    assert_eq!(
        data.column("b").unwrap(),
        &[Value::Integer(1), Value::Null, Value::Null]
    );
    assert!(data.validate_lengths().is_ok());

    assert_eq!(data.fill("b", Value::Null).unwrap(), 0);
    assert_eq!(data.column("b").unwrap().len(), 3);
}

#[test]
fn test_fill_then_retry_records() {
    let mut columns = ColumnMap::new();
    columns.insert("a".to_string(), vec![1.into(), 2.into()]);
    columns.insert("b".to_string(), vec!["x".into()]);
    let mut data = Dataset::new(columns).unwrap();

    assert!(data.records().is_err());
    data.fill("b", "missing").unwrap();
    let records = data.records().unwrap();
    assert_eq!(records[1]["b"], Value::from("missing"));
}

#[test]
fn test_fill_unknown_column_fails() {
    let mut data = Dataset::new(sample_columns()).unwrap();
    assert!(matches!(
        data.fill("nope", 0),
        Err(Error::UnknownColumn { .. })
    ));
}
