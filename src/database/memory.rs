//! In-memory storage backend
//!
//! Holds rows in process and enforces the constraints a relational
//! store would: NOT NULL, UNIQUE, and foreign keys.

use super::backend::StorageBackend;
use crate::error::{Error, Result};
use crate::table::{ConstraintKind, TableDefinition};
use crate::types::{Record, Value};
use indexmap::IndexMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
struct MemoryTable {
    definition: TableDefinition,
    rows: Vec<Record>,
    next_id: i64,
}

/// Storage backend keeping every table in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: IndexMap<String, MemoryTable>,
}

impl MemoryBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows stored in a table, in insertion order
    pub fn rows(&self, table: &str) -> Option<&[Record]> {
        self.tables.get(table).map(|t| t.rows.as_slice())
    }

    /// Definition a table was created with
    pub fn definition(&self, table: &str) -> Option<&TableDefinition> {
        self.tables.get(table).map(|t| &t.definition)
    }

    fn dependents_of(&self, table: &str) -> Vec<String> {
        self.tables
            .values()
            .filter(|t| t.definition.references_table(table))
            .map(|t| t.definition.name.clone())
            .collect()
    }

    /// Fill in the key, defaults and nulls for a new row
    fn complete_row(table: &MemoryTable, record: &Record) -> Result<Record> {
        let definition = &table.definition;
        if let Some(unknown) = record.keys().find(|k| definition.column(k).is_none()) {
            return Err(Error::unknown_column(&definition.name, unknown.as_str()));
        }

        let mut row = Record::with_capacity(definition.columns.len());
        for column in &definition.columns {
            let value = match record.get(&column.name) {
                Some(value) => value.clone(),
                None if column.name == definition.primary_key => Value::Integer(table.next_id),
                None => column.default_value().cloned().unwrap_or(Value::Null),
            };
            row.insert(column.name.clone(), value);
        }
        Ok(row)
    }

    fn check_row(&self, table: &MemoryTable, row: &Record) -> Result<()> {
        let definition = &table.definition;

        for column in &definition.columns {
            let value = row.get(&column.name).unwrap_or(&Value::Null);
            if column.is_not_null() && value.is_null() {
                return Err(Error::constraint(
                    &definition.name,
                    format!("NOT NULL constraint failed: {}.{}", definition.name, column.name),
                ));
            }
            if column.is_unique() {
                check_unique(table, row, &[column.name.as_str()])?;
            }
        }

        for constraint in &definition.constraints {
            if constraint.kind == ConstraintKind::Unique {
                let columns: Vec<&str> = constraint.columns.iter().map(String::as_str).collect();
                check_unique(table, row, &columns)?;
            }
        }

        for (columns, parent, parent_columns) in definition.foreign_keys() {
            let key: Vec<&Value> = columns
                .iter()
                .map(|c| row.get(*c).unwrap_or(&Value::Null))
                .collect();
            if key.iter().any(|v| v.is_null()) {
                continue;
            }

            let parent_rows: Vec<&Record> = if parent == definition.name {
                table.rows.iter().chain(std::iter::once(row)).collect()
            } else {
                match self.tables.get(parent) {
                    Some(p) => p.rows.iter().collect(),
                    None => Vec::new(),
                }
            };

            let found = parent_rows.iter().any(|candidate| {
                parent_columns
                    .iter()
                    .zip(&key)
                    .all(|(c, v)| candidate.get(*c) == Some(*v))
            });
            if !found {
                let shown: Vec<String> = key.iter().map(ToString::to_string).collect();
                return Err(Error::referential(
                    &definition.name,
                    format!(
                        "key ({}) = ({}) is not present in table '{parent}'",
                        columns.join(", "),
                        shown.join(", ")
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn check_unique(table: &MemoryTable, row: &Record, columns: &[&str]) -> Result<()> {
    let key: Vec<&Value> = columns
        .iter()
        .map(|c| row.get(*c).unwrap_or(&Value::Null))
        .collect();
    if key.iter().any(|v| v.is_null()) {
        return Ok(());
    }

    let duplicate = table
        .rows
        .iter()
        .any(|existing| columns.iter().zip(&key).all(|(c, v)| existing.get(*c) == Some(*v)));
    if duplicate {
        return Err(Error::constraint(
            &table.definition.name,
            format!("duplicate key for ({})", columns.join(", ")),
        ));
    }
    Ok(())
}

impl StorageBackend for MemoryBackend {
    fn connect(location: &str) -> Result<Self> {
        tracing::debug!(location, "Opened in-memory store");
        Ok(Self::new())
    }

    fn reflect(&self) -> Result<BTreeSet<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn describe(&self, table: &str) -> Result<TableDefinition> {
        self.definition(table)
            .cloned()
            .ok_or_else(|| Error::TableNotFound {
                table: table.to_string(),
            })
    }

    fn execute_ddl(&mut self, table: &TableDefinition) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Ok(());
        }
        if let Some(missing) = table
            .referenced_tables()
            .into_iter()
            .find(|parent| !self.tables.contains_key(*parent))
        {
            return Err(Error::referential(
                &table.name,
                format!("referenced table '{missing}' does not exist"),
            ));
        }

        self.tables.insert(
            table.name.clone(),
            MemoryTable {
                definition: table.clone(),
                rows: Vec::new(),
                next_id: 1,
            },
        );
        Ok(())
    }

    fn execute_insert(&mut self, table: &str, record: &Record) -> Result<()> {
        let target = self.tables.get(table).ok_or_else(|| Error::TableNotFound {
            table: table.to_string(),
        })?;

        let row = Self::complete_row(target, record)?;
        self.check_row(target, &row)?;

        let Some(stored) = self.tables.get_mut(table) else {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        };
        if let Some(Value::Integer(id)) = row.get(&stored.definition.primary_key) {
            stored.next_id = stored.next_id.max(id.saturating_add(1));
        }
        stored.rows.push(row);
        Ok(())
    }

    fn drop_table(&mut self, table: &str, cascade: bool) -> Result<()> {
        if !self.tables.contains_key(table) {
            return Ok(());
        }

        let dependents = self.dependents_of(table);
        if !dependents.is_empty() && !cascade {
            return Err(Error::referential(
                table,
                format!("table is referenced by {}", dependents.join(", ")),
            ));
        }

        self.tables.shift_remove(table);
        for dependent in dependents {
            self.drop_table(&dependent, true)?;
        }
        Ok(())
    }
}
