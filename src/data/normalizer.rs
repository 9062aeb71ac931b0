//! Normalization of column- or row-oriented input into a column map

use crate::error::{Error, Result};
use crate::types::{ColumnMap, Record, Value};
use std::collections::BTreeSet;

/// Caller-supplied data in either supported shape
#[derive(Debug, Clone, PartialEq)]
pub enum RawDataset {
    /// Column name to ordered values
    Columns(ColumnMap),
    /// Ordered rows sharing an identical key set
    Rows(Vec<Record>),
}

impl RawDataset {
    /// Interpret a JSON document as a dataset
    ///
    /// An object of arrays is column-oriented; an array of objects is
    /// row-oriented.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Object(map) => {
                let mut columns = ColumnMap::with_capacity(map.len());
                for (name, values) in map {
                    let serde_json::Value::Array(values) = values else {
                        return Err(Error::invalid_input(format!(
                            "column '{name}' must be an array"
                        )));
                    };
                    columns.insert(name, values.into_iter().map(Value::from).collect());
                }
                Ok(RawDataset::Columns(columns))
            }
            serde_json::Value::Array(rows) => rows
                .into_iter()
                .enumerate()
                .map(|(i, row)| match row {
                    serde_json::Value::Object(map) => Ok(map
                        .into_iter()
                        .map(|(k, v)| (k, Value::from(v)))
                        .collect::<Record>()),
                    other => Err(Error::invalid_input(format!(
                        "row {i} must be an object, found {}",
                        json_type_name(&other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(RawDataset::Rows),
            other => Err(Error::invalid_input(format!(
                "expected an object of columns or an array of rows, found {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl From<ColumnMap> for RawDataset {
    fn from(columns: ColumnMap) -> Self {
        RawDataset::Columns(columns)
    }
}

impl From<Vec<Record>> for RawDataset {
    fn from(rows: Vec<Record>) -> Self {
        RawDataset::Rows(rows)
    }
}

/// Options controlling normalization
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Require every column to have the same length
    pub validate_lengths: bool,
}

impl NormalizeOptions {
    /// Create default options (lengths are not validated)
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable length validation
    #[must_use]
    pub fn with_validate_lengths(mut self, enabled: bool) -> Self {
        self.validate_lengths = enabled;
        self
    }
}

/// Normalize raw input into the canonical column map
///
/// Column-oriented input is moved through untouched. Row-oriented input is
/// pivoted, keeping row order within each column.
pub fn normalize(raw: RawDataset, options: &NormalizeOptions) -> Result<ColumnMap> {
    let columns = match raw {
        RawDataset::Columns(columns) => columns,
        RawDataset::Rows(rows) => pivot_rows(rows)?,
    };

    if options.validate_lengths {
        check_lengths(&columns)?;
    }

    Ok(columns)
}

/// Fail with every column's length unless all lengths are equal
pub fn check_lengths(columns: &ColumnMap) -> Result<()> {
    let distinct: BTreeSet<usize> = columns.values().map(Vec::len).collect();
    if distinct.len() <= 1 {
        return Ok(());
    }
    Err(Error::LengthMismatch {
        lengths: columns
            .iter()
            .map(|(name, values)| (name.clone(), values.len()))
            .collect(),
    })
}

fn pivot_rows(rows: Vec<Record>) -> Result<ColumnMap> {
    let Some(first) = rows.first() else {
        return Ok(ColumnMap::new());
    };

    let expected: BTreeSet<String> = first.keys().cloned().collect();
    let mut columns: ColumnMap = first
        .keys()
        .map(|key| (key.clone(), Vec::with_capacity(rows.len())))
        .collect();

    for (row_index, row) in rows.into_iter().enumerate() {
        let found: BTreeSet<&String> = row.keys().collect();
        if found.len() != expected.len() || !found.iter().all(|k| expected.contains(*k)) {
            return Err(Error::SchemaMismatch {
                row: row_index,
                expected: expected.iter().cloned().collect(),
                found: found.into_iter().cloned().collect(),
            });
        }
        for (key, value) in row {
            if let Some(column) = columns.get_mut(&key) {
                column.push(value);
            }
        }
    }

    tracing::debug!(columns = columns.len(), "Pivoted row-oriented input");
    Ok(columns)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
