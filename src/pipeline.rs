//! End-to-end load: infer a table from a dataset, create it, insert rows

use crate::coerce::Coercer;
use crate::data::Dataset;
use crate::database::{SchemaMapper, StorageBackend};
use crate::error::Result;
use crate::table::{build_columns, ColumnModifier, TableBuilder, TableConstraint};
use serde::Serialize;
use std::collections::HashMap;

/// What to call the table and how to shape it
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub primary_key: Option<String>,
    pub modifiers: HashMap<String, Vec<ColumnModifier>>,
    pub constraints: Vec<TableConstraint>,
    pub coercer: Coercer,
}

impl TableSpec {
    /// Spec for a plain table with a default surrogate key
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            modifiers: HashMap::new(),
            constraints: Vec::new(),
            coercer: Coercer::new(),
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_modifier(mut self, column: impl Into<String>, modifier: ColumnModifier) -> Self {
        self.modifiers.entry(column.into()).or_default().push(modifier);
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn with_coercer(mut self, coercer: Coercer) -> Self {
        self.coercer = coercer;
        self
    }
}

/// Outcome of a load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub table: String,
    /// Persisted data columns, in order
    pub columns: Vec<String>,
    /// Columns left out because every value was null
    pub skipped: Vec<String>,
    pub rows: usize,
    /// Whether this load created the table
    pub created: bool,
}

/// Load a dataset into a new or existing table
///
/// Records are typed before anything touches the store, so input errors
/// leave it unchanged. The mapper binding is released whether the load
/// succeeds or not.
pub fn load<B: StorageBackend>(
    mapper: &mut SchemaMapper<B>,
    dataset: &Dataset,
    spec: &TableSpec,
) -> Result<LoadSummary> {
    let kinds = dataset.column_kinds()?;
    let columns = build_columns(&kinds, Some(&spec.modifiers));

    let mut builder = TableBuilder::new(spec.name.clone());
    if let Some(primary_key) = &spec.primary_key {
        builder = builder.with_primary_key(primary_key.clone());
    }
    for constraint in &spec.constraints {
        builder = builder.with_constraint(constraint.clone());
    }
    let table = builder.build(columns)?;

    let records = dataset.records_as(&kinds, &spec.coercer)?;

    let summary = LoadSummary {
        table: table.name.clone(),
        columns: table.data_columns().map(|c| c.name.clone()).collect(),
        skipped: kinds
            .iter()
            .filter(|(_, kind)| !kind.is_persistable())
            .map(|(name, _)| name.clone())
            .collect(),
        rows: records.len(),
        created: false,
    };

    mapper.map(table)?;
    let result = mapper.create_all().and_then(|created| {
        mapper.insert_all(&records)?;
        Ok(created.contains(&summary.table))
    });
    mapper.clear();

    let created = result?;
    tracing::info!(
        table = %summary.table,
        rows = summary.rows,
        created,
        "Loaded dataset"
    );
    Ok(LoadSummary { created, ..summary })
}
