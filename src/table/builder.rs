//! Column and table definition assembly

use super::types::{
    ColumnDefinition, ColumnModifier, TableConstraint, TableDefinition, DEFAULT_PRIMARY_KEY,
};
use crate::error::{Error, Result};
use crate::schema::ScalarKind;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Turn inferred kinds into column definitions
///
/// Columns whose kind is `Null` are skipped. Modifiers from `extra_args` are
/// attached in the order given.
pub fn build_columns(
    column_kinds: &IndexMap<String, ScalarKind>,
    extra_args: Option<&HashMap<String, Vec<ColumnModifier>>>,
) -> Vec<ColumnDefinition> {
    column_kinds
        .iter()
        .filter_map(|(name, kind)| {
            if !kind.is_persistable() {
                tracing::debug!(column = %name, "Skipping all-null column");
                return None;
            }
            let modifiers = extra_args
                .and_then(|args| args.get(name))
                .cloned()
                .unwrap_or_default();
            Some(ColumnDefinition {
                name: name.clone(),
                kind: *kind,
                modifiers,
            })
        })
        .collect()
}

/// Assemble a table with the default surrogate key name
pub fn build_table(
    name: &str,
    columns: Vec<ColumnDefinition>,
    constraints: Option<Vec<TableConstraint>>,
) -> Result<TableDefinition> {
    let mut builder = TableBuilder::new(name);
    for constraint in constraints.unwrap_or_default() {
        builder = builder.with_constraint(constraint);
    }
    builder.build(columns)
}

/// Table definition builder
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    primary_key: String,
    constraints: Vec<TableConstraint>,
}

impl TableBuilder {
    /// Create a builder for a table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            constraints: Vec::new(),
        }
    }

    /// Set the surrogate primary key column name
    #[must_use]
    pub fn with_primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    /// Add a table-level constraint
    #[must_use]
    pub fn with_constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Build the table, prepending the surrogate integer primary key
    ///
    /// Fails on duplicate column names (including a data column named like
    /// the surrogate key) and on constraints naming columns the table lacks.
    /// Foreign key targets are not checked here.
    pub fn build(self, columns: Vec<ColumnDefinition>) -> Result<TableDefinition> {
        if self.name.is_empty() {
            return Err(Error::invalid_input("table name must not be empty"));
        }

        let mut all = Vec::with_capacity(columns.len() + 1);
        all.push(
            ColumnDefinition::new(self.primary_key.clone(), ScalarKind::Integer)
                .with_modifier(ColumnModifier::PrimaryKey),
        );
        all.extend(columns);

        let mut seen = HashSet::with_capacity(all.len());
        for column in &all {
            if column.name.is_empty() {
                return Err(Error::invalid_input(format!(
                    "column names in '{}' must not be empty",
                    self.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(Error::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }

        for constraint in &self.constraints {
            if constraint.columns.is_empty() {
                return Err(Error::invalid_input(format!(
                    "constraint on '{}' names no columns",
                    self.name
                )));
            }
            if let Some(missing) = constraint
                .columns
                .iter()
                .find(|c| !seen.contains(c.as_str()))
            {
                return Err(Error::unknown_column(&self.name, missing.as_str()));
            }
        }

        tracing::debug!(
            table = %self.name,
            columns = all.len(),
            constraints = self.constraints.len(),
            "Built table definition"
        );

        Ok(TableDefinition {
            name: self.name,
            primary_key: self.primary_key,
            columns: all,
            constraints: self.constraints,
        })
    }
}
