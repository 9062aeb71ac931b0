//! Schema builder tests

use super::*;
use crate::error::Error;
use crate::schema::ScalarKind;
use crate::types::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

fn kinds(pairs: &[(&str, ScalarKind)]) -> IndexMap<String, ScalarKind> {
    pairs
        .iter()
        .map(|(name, kind)| ((*name).to_string(), *kind))
        .collect()
}

#[test]
fn test_build_columns_skips_null_kinds() {
    let columns = build_columns(
        &kinds(&[
            ("strings", ScalarKind::String),
            ("nils", ScalarKind::Null),
            ("ints", ScalarKind::Integer),
        ]),
        None,
    );
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["strings", "ints"]);
    assert!(columns.iter().all(|c| c.modifiers.is_empty()));
}

#[test]
fn test_build_columns_attaches_extra_args() {
    let mut extra = HashMap::new();
    extra.insert(
        "team_id".to_string(),
        vec![
            ColumnModifier::NotNull,
            ColumnModifier::References {
                table: "teams".to_string(),
                column: "id".to_string(),
            },
        ],
    );
    extra.insert(
        "score".to_string(),
        vec![ColumnModifier::Default(Value::Float(0.0))],
    );

    let columns = build_columns(
        &kinds(&[
            ("team_id", ScalarKind::Integer),
            ("score", ScalarKind::Float),
        ]),
        Some(&extra),
    );

    assert!(columns[0].is_not_null());
    assert_eq!(columns[0].references(), Some(("teams", "id")));
    assert_eq!(columns[1].default_value(), Some(&Value::Float(0.0)));
    assert!(!columns[1].is_unique());
}

#[test]
fn test_build_table_prepends_surrogate_key() {
    let columns = vec![ColumnDefinition::new("name", ScalarKind::String)];
    let table = build_table("players", columns, None).unwrap();

    assert_eq!(table.name, "players");
    assert_eq!(table.primary_key, DEFAULT_PRIMARY_KEY);
    assert_eq!(table.columns[0].name, "id");
    assert_eq!(table.columns[0].kind, ScalarKind::Integer);
    assert!(table.columns[0].is_primary_key());
    assert_eq!(table.data_columns().count(), 1);
    assert!(table.constraints.is_empty());
}

#[test]
fn test_custom_primary_key_name() {
    let table = TableBuilder::new("games")
        .with_primary_key("game_id")
        .build(vec![ColumnDefinition::new("id", ScalarKind::String)])
        .unwrap();
    assert_eq!(table.columns[0].name, "game_id");
    assert!(table.column("id").is_some());
}

#[test]
fn test_data_column_clashing_with_key_fails() {
    let err = build_table(
        "players",
        vec![ColumnDefinition::new("id", ScalarKind::String)],
        None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateColumn { ref column, .. } if column == "id"));
}

#[test]
fn test_constraints_are_checked_against_columns() {
    let columns = vec![
        ColumnDefinition::new("first", ScalarKind::String),
        ColumnDefinition::new("last", ScalarKind::String),
    ];
    let table = build_table(
        "people",
        columns.clone(),
        Some(vec![TableConstraint::unique(["first", "last"])]),
    )
    .unwrap();
    assert_eq!(table.constraints.len(), 1);
    assert_eq!(table.constraints[0].kind, ConstraintKind::Unique);

    let err = build_table(
        "people",
        columns,
        Some(vec![TableConstraint::unique(["first", "middle"])]),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownColumn { ref column, .. } if column == "middle"));
}

#[test]
fn test_foreign_key_target_not_checked_at_build_time() {
    let table = build_table(
        "scores",
        vec![ColumnDefinition::new("game", ScalarKind::Integer)],
        Some(vec![TableConstraint::foreign_key(
            ["game"],
            "no_such_table",
            ["id"],
        )]),
    )
    .unwrap();
    assert_eq!(table.referenced_tables(), vec!["no_such_table"]);
    assert!(table.references_table("no_such_table"));
    assert_eq!(
        table.foreign_keys(),
        vec![(vec!["game"], "no_such_table", vec!["id"])]
    );
}

#[test]
fn test_self_reference_is_not_a_dependency() {
    let table = build_table(
        "employees",
        vec![ColumnDefinition::new("manager", ScalarKind::Integer).with_modifier(
            ColumnModifier::References {
                table: "employees".to_string(),
                column: "id".to_string(),
            },
        )],
        None,
    )
    .unwrap();
    assert!(table.referenced_tables().is_empty());
    assert_eq!(table.foreign_keys().len(), 1);
}

#[test]
fn test_empty_names_rejected() {
    assert!(matches!(
        build_table("", vec![], None),
        Err(Error::InvalidInput { .. })
    ));
    assert!(matches!(
        build_table("t", vec![ColumnDefinition::new("", ScalarKind::String)], None),
        Err(Error::InvalidInput { .. })
    ));
}

#[test]
fn test_definition_serializes() {
    let table = build_table(
        "t",
        vec![ColumnDefinition::new("x", ScalarKind::Date)
            .with_modifier(ColumnModifier::Unique)],
        None,
    )
    .unwrap();
    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["columns"][1]["kind"], "date");
    assert_eq!(json["columns"][1]["modifiers"][0], "unique");
    assert_eq!(json["columns"][0]["modifiers"][0], "primary_key");
}
