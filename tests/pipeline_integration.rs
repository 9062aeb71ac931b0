//! End-to-end tests against DuckDB
//!
//! Every test uses an in-memory database or a file in a temp directory.

use chrono::NaiveDate;
use clap::Parser;
use data_to_table::cli::{Cli, Runner};
use data_to_table::coerce::Coercer;
use data_to_table::database::MEMORY_LOCATION;
use data_to_table::schema::ScalarKind;
use data_to_table::table::{ColumnDefinition, ColumnModifier};
use data_to_table::{
    build_table, load, load_config_from_str, Dataset, DuckDbBackend, Error, NormalizeOptions,
    Record, SchemaMapper, TableSpec, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::tempdir;

fn memory_mapper() -> SchemaMapper<DuckDbBackend> {
    SchemaMapper::connect(MEMORY_LOCATION).unwrap()
}

fn dataset(json: serde_json::Value) -> Dataset {
    Dataset::from_json(json, &NormalizeOptions::new()).unwrap()
}

fn sample() -> Dataset {
    dataset(json!({
        "strings": ["hi", "world", "bye", "school"],
        "ints": [1, 2, 3, 4],
        "floats": [1.1, 2.2, 3.3, 4.4444],
        "nils": [null, null, null, null]
    }))
}

fn run_cli(database: &str, args: &[&str]) -> data_to_table::Result<()> {
    let mut argv = vec!["data-to-table", "--database", database];
    argv.extend_from_slice(args);
    Runner::new(Cli::parse_from(argv)).run()
}

fn teams_spec() -> TableSpec {
    TableSpec::new("teams").with_modifier("name", ColumnModifier::Unique)
}

fn players_spec() -> TableSpec {
    TableSpec::new("players").with_modifier(
        "team_id",
        ColumnModifier::References {
            table: "teams".to_string(),
            column: "id".to_string(),
        },
    )
}

#[test]
fn test_load_end_to_end() {
    let mut mapper = memory_mapper();
    let summary = load(&mut mapper, &sample(), &TableSpec::new("sample")).unwrap();

    assert_eq!(summary.columns, vec!["strings", "ints", "floats"]);
    assert_eq!(summary.skipped, vec!["nils"]);
    assert_eq!(summary.rows, 4);
    assert!(summary.created);

    let backend = mapper.backend();
    assert_eq!(
        backend.columns("sample").unwrap(),
        vec!["id", "strings", "ints", "floats"]
    );

    let rows = backend.select_all("sample").unwrap();
    assert_eq!(rows.len(), 4);
    let ids: Vec<&Value> = rows.iter().map(|r| &r["id"]).collect();
    assert_eq!(
        ids,
        vec![
            &Value::Integer(1),
            &Value::Integer(2),
            &Value::Integer(3),
            &Value::Integer(4)
        ]
    );
    assert_eq!(rows[3]["strings"], Value::from("school"));
    assert_eq!(rows[3]["floats"], Value::Float(4.4444));
}

#[test]
fn test_mixed_columns_are_promoted() {
    let mut mapper = memory_mapper();
    let data = dataset(json!({
        "int_float": [1, 2, 1.1, 2.2],
        "int_float_string": [1, 1.1, "1.1", "2.2cm"]
    }));
    load(&mut mapper, &data, &TableSpec::new("mixed")).unwrap();

    let rows = mapper.backend().select_all("mixed").unwrap();
    assert_eq!(rows[0]["int_float"], Value::Float(1.0));
    assert_eq!(rows[1]["int_float_string"], Value::from("1.1"));
    assert_eq!(rows[3]["int_float_string"], Value::from("2.2cm"));
}

#[test]
fn test_file_database_persists_and_appends() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.duckdb");
    let location = path.to_string_lossy().to_string();

    {
        let mut mapper: SchemaMapper<DuckDbBackend> = SchemaMapper::connect(&location).unwrap();
        load(&mut mapper, &sample(), &TableSpec::new("sample")).unwrap();
    }

    let mut mapper: SchemaMapper<DuckDbBackend> = SchemaMapper::connect(&location).unwrap();
    assert!(mapper.exists("sample").unwrap());

    let summary = load(&mut mapper, &sample(), &TableSpec::new("sample")).unwrap();
    assert!(!summary.created);
    assert_eq!(mapper.backend().row_count("sample").unwrap(), 8);
}

#[test]
fn test_map_existing_table_in_fresh_session() {
    let dir = tempdir().unwrap();
    let location = dir.path().join("reopen.duckdb").to_string_lossy().to_string();

    {
        let mut mapper: SchemaMapper<DuckDbBackend> = SchemaMapper::connect(&location).unwrap();
        load(&mut mapper, &dataset(json!({"name": ["Reds"]})), &teams_spec()).unwrap();
        load(
            &mut mapper,
            &dataset(json!({"name": ["Ann"], "team_id": [1]})),
            &players_spec(),
        )
        .unwrap();
    }

    let mut mapper: SchemaMapper<DuckDbBackend> = SchemaMapper::connect(&location).unwrap();
    assert!(mapper.definition("players").is_none());
    mapper.map_existing("players").unwrap();

    let players = mapper.mapped().unwrap();
    assert_eq!(players.primary_key, "id");
    assert_eq!(players.column("team_id").unwrap().kind, ScalarKind::Integer);
    assert_eq!(
        players.column("team_id").unwrap().references(),
        Some(("teams", "id"))
    );

    let mut row = Record::new();
    row.insert("name".to_string(), Value::from("Bob"));
    row.insert("team_id".to_string(), Value::from("1"));
    mapper.insert(&row).unwrap();

    row.insert("team_id".to_string(), Value::Integer(7));
    let err = mapper.insert(&row).unwrap_err();
    assert!(matches!(err, Error::ReferentialIntegrity { .. }), "{err}");

    let rows = mapper.backend().select_all("players").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["id"], Value::Integer(2));
    assert_eq!(rows[1]["team_id"], Value::Integer(1));

    assert_eq!(mapper.automap().unwrap(), vec!["teams".to_string()]);
}

#[test]
fn test_foreign_key_violation_on_insert() {
    let mut mapper = memory_mapper();
    load(
        &mut mapper,
        &dataset(json!({"name": ["Reds", "Blues"]})),
        &teams_spec(),
    )
    .unwrap();

    load(
        &mut mapper,
        &dataset(json!([{"name": "Ann", "team_id": 2}])),
        &players_spec(),
    )
    .unwrap();

    let err = load(
        &mut mapper,
        &dataset(json!([{"name": "Bob", "team_id": 99}])),
        &players_spec(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ReferentialIntegrity { .. }), "{err}");
    assert!(mapper.mapped().is_none());
    assert_eq!(mapper.backend().row_count("players").unwrap(), 1);
}

#[test]
fn test_unique_violation_on_insert() {
    let mut mapper = memory_mapper();
    let err = load(
        &mut mapper,
        &dataset(json!({"name": ["Reds", "Reds"]})),
        &teams_spec(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation { .. }), "{err}");
}

#[test]
fn test_create_all_is_idempotent() {
    let mut mapper = memory_mapper();
    let table = build_table(
        "events",
        vec![ColumnDefinition::new("at", ScalarKind::DateTime)],
        None,
    )
    .unwrap();
    mapper.define(table).unwrap();

    assert_eq!(mapper.create_all().unwrap(), vec!["events".to_string()]);
    assert!(mapper.create_all().unwrap().is_empty());
    assert_eq!(
        mapper.tables().unwrap().into_iter().collect::<Vec<_>>(),
        vec!["events".to_string()]
    );
}

#[test]
fn test_drop_with_and_without_cascade_in_fresh_session() {
    let dir = tempdir().unwrap();
    let location = dir.path().join("fk.duckdb").to_string_lossy().to_string();

    {
        let mut mapper: SchemaMapper<DuckDbBackend> = SchemaMapper::connect(&location).unwrap();
        load(&mut mapper, &dataset(json!({"name": ["Reds"]})), &teams_spec()).unwrap();
        load(
            &mut mapper,
            &dataset(json!({"name": ["Ann"], "team_id": [1]})),
            &players_spec(),
        )
        .unwrap();
    }

    let mut mapper: SchemaMapper<DuckDbBackend> = SchemaMapper::connect(&location).unwrap();
    let err = mapper.drop("teams", false).unwrap_err();
    assert!(matches!(err, Error::ReferentialIntegrity { .. }), "{err}");
    assert!(mapper.exists("teams").unwrap());

    mapper.drop("teams", true).unwrap();
    assert!(mapper.tables().unwrap().is_empty());
    assert!(matches!(
        mapper.drop("teams", false),
        Err(Error::TableNotFound { .. })
    ));
}

#[test]
fn test_date_strings_need_an_explicit_format() {
    let table = build_table(
        "days",
        vec![ColumnDefinition::new("day", ScalarKind::Date)],
        None,
    )
    .unwrap();
    let mut row = Record::new();
    row.insert("day".to_string(), Value::from("2019-01-05"));

    let mut strict = memory_mapper();
    strict.map(table.clone()).unwrap();
    strict.create_all().unwrap();
    let err = strict.insert(&row).unwrap_err();
    assert!(matches!(err.root(), Error::UnsupportedCoercion { .. }), "{err}");

    let mut lenient = memory_mapper().with_coercer(Coercer::new().with_date_format("%Y-%m-%d"));
    lenient.map(table).unwrap();
    lenient.create_all().unwrap();
    lenient.insert(&row).unwrap();

    let rows = lenient.backend().select_all("days").unwrap();
    assert_eq!(
        rows[0]["day"],
        Value::Date(NaiveDate::from_ymd_opt(2019, 1, 5).unwrap())
    );
}

#[test]
fn test_config_driven_load() {
    let config = load_config_from_str(
        r#"
table:
  name: scores
  validate_lengths: true
  fill:
    bonus: 0
  columns:
    player:
      - type: not_null
"#,
    )
    .unwrap();

    assert!(config.normalize_options().validate_lengths);
    let mut data = dataset(json!({"player": ["a", "b"], "bonus": [5]}));
    assert!(matches!(
        data.records(),
        Err(Error::LengthMismatch { .. })
    ));
    for (column, value) in config.fill_values() {
        data.fill(column, value).unwrap();
    }
    data.validate_lengths().unwrap();

    let mut mapper = memory_mapper();
    let summary = load(&mut mapper, &data, &config.table_spec()).unwrap();
    assert_eq!(summary.rows, 2);

    let rows = mapper.backend().select_all("scores").unwrap();
    assert_eq!(rows[1]["bonus"], Value::Integer(0));
}

#[test]
fn test_cli_load_tables_export_drop() {
    let dir = tempdir().unwrap();
    let database = dir.path().join("cli.duckdb").to_string_lossy().to_string();
    let input = dir.path().join("data.json");
    let output = dir.path().join("out.parquet");
    fs::write(
        &input,
        r#"[{"name": "hi", "count": 1}, {"name": "world", "count": 2}]"#,
    )
    .unwrap();

    let input_arg = input.to_string_lossy().to_string();
    let output_arg = output.to_string_lossy().to_string();

    let db = database.as_str();
    let input_arg = input_arg.as_str();

    run_cli(db, &["infer", "--input", input_arg]).unwrap();
    run_cli(db, &["load", "--input", input_arg, "--table", "words"]).unwrap();
    run_cli(db, &["tables"]).unwrap();
    run_cli(db, &["describe", "words"]).unwrap();
    run_cli(db, &["export", "--table", "words", "--output", output_arg.as_str()]).unwrap();
    assert!(output.exists());
    run_cli(
        db,
        &[
            "export",
            "--table",
            "words",
            "--output",
            output_arg.as_str(),
            "--compression",
            "zstd",
            "--row-group-size",
            "1",
        ],
    )
    .unwrap();

    run_cli(db, &["drop", "words"]).unwrap();
    assert!(matches!(
        run_cli(db, &["drop", "words"]),
        Err(Error::TableNotFound { .. })
    ));
    assert!(matches!(
        run_cli(db, &["load", "--input", input_arg]),
        Err(Error::Config { .. })
    ));
}
