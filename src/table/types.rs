//! Table definition types

use crate::schema::ScalarKind;
use crate::types::Value;
use serde::Serialize;

/// Default name of the surrogate primary key column
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Extra argument attached to a column definition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnModifier {
    /// Column is the table's primary key
    PrimaryKey,
    /// Column rejects nulls
    NotNull,
    /// Column values must be unique
    Unique,
    /// Value used when an insert omits the column
    Default(Value),
    /// Foreign key into another table's column
    References { table: String, column: String },
}

/// A single column: name, resolved kind, and modifiers in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub kind: ScalarKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<ColumnModifier>,
}

impl ColumnDefinition {
    /// Create a column with no modifiers
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: Vec::new(),
        }
    }

    /// Append a modifier
    #[must_use]
    pub fn with_modifier(mut self, modifier: ColumnModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Check if the column is the primary key
    pub fn is_primary_key(&self) -> bool {
        self.modifiers.contains(&ColumnModifier::PrimaryKey)
    }

    /// Check if the column rejects nulls
    pub fn is_not_null(&self) -> bool {
        self.is_primary_key() || self.modifiers.contains(&ColumnModifier::NotNull)
    }

    /// Check if the column must hold unique values
    pub fn is_unique(&self) -> bool {
        self.is_primary_key() || self.modifiers.contains(&ColumnModifier::Unique)
    }

    /// The column's default value, if any
    pub fn default_value(&self) -> Option<&Value> {
        self.modifiers.iter().find_map(|m| match m {
            ColumnModifier::Default(value) => Some(value),
            _ => None,
        })
    }

    /// The `(table, column)` this column references, if any
    pub fn references(&self) -> Option<(&str, &str)> {
        self.modifiers.iter().find_map(|m| match m {
            ColumnModifier::References { table, column } => {
                Some((table.as_str(), column.as_str()))
            }
            _ => None,
        })
    }
}

/// Table-level constraint kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// The combination of columns is unique
    Unique,
    /// The columns reference columns of another table
    ForeignKey { table: String, columns: Vec<String> },
}

/// A table-level constraint tagged with the columns it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableConstraint {
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
}

impl TableConstraint {
    /// Unique constraint over the given columns
    pub fn unique<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            kind: ConstraintKind::Unique,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Foreign key from `columns` to `references_columns` of `table`
    pub fn foreign_key<S: Into<String>, R: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        table: impl Into<String>,
        references_columns: impl IntoIterator<Item = R>,
    ) -> Self {
        Self {
            kind: ConstraintKind::ForeignKey {
                table: table.into(),
                columns: references_columns.into_iter().map(Into::into).collect(),
            },
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// A named table: surrogate key first, then data columns, then constraints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDefinition {
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<TableConstraint>,
}

impl TableDefinition {
    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns other than the surrogate key
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.name != self.primary_key)
    }

    /// Every table this table holds a foreign key into (excluding itself)
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self
            .columns
            .iter()
            .filter_map(|c| c.references().map(|(table, _)| table))
            .chain(self.constraints.iter().filter_map(|c| match &c.kind {
                ConstraintKind::ForeignKey { table, .. } => Some(table.as_str()),
                ConstraintKind::Unique => None,
            }))
            .filter(|t| *t != self.name)
            .collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }

    /// Check if this table holds a foreign key into `table`
    pub fn references_table(&self, table: &str) -> bool {
        self.referenced_tables().contains(&table)
    }

    /// Foreign keys as `(local columns, referenced table, referenced columns)`
    pub fn foreign_keys(&self) -> Vec<(Vec<&str>, &str, Vec<&str>)> {
        let column_fks = self.columns.iter().filter_map(|c| {
            c.references()
                .map(|(table, column)| (vec![c.name.as_str()], table, vec![column]))
        });
        let table_fks = self.constraints.iter().filter_map(|c| match &c.kind {
            ConstraintKind::ForeignKey { table, columns } => Some((
                c.columns.iter().map(String::as_str).collect(),
                table.as_str(),
                columns.iter().map(String::as_str).collect(),
            )),
            ConstraintKind::Unique => None,
        });
        column_fks.chain(table_fks).collect()
    }
}
