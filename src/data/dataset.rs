//! Dataset: the canonical column map plus the operations over it

use super::normalizer::{check_lengths, normalize, NormalizeOptions, RawDataset};
use crate::coerce::Coercer;
use crate::error::{Error, Result, ResultExt};
use crate::schema::{infer_columns, ScalarKind};
use crate::types::{ColumnMap, Record, Value};
use indexmap::IndexMap;

/// Normalized, column-oriented data ready for inference and materialization
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: ColumnMap,
}

impl Dataset {
    /// Normalize raw input with default options
    pub fn new(raw: impl Into<RawDataset>) -> Result<Self> {
        Self::with_options(raw, &NormalizeOptions::default())
    }

    /// Normalize raw input with explicit options
    pub fn with_options(raw: impl Into<RawDataset>, options: &NormalizeOptions) -> Result<Self> {
        let columns = normalize(raw.into(), options)?;
        Ok(Self { columns })
    }

    /// Parse a JSON document (object of arrays or array of objects)
    pub fn from_json(json: serde_json::Value, options: &NormalizeOptions) -> Result<Self> {
        Self::with_options(RawDataset::from_json(json)?, options)
    }

    /// All columns, in input order
    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Values of a single column
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Give back the column map
    pub fn into_columns(self) -> ColumnMap {
        self.columns
    }

    /// Number of rows: the length of the longest column
    ///
    /// Columns may differ in length until they are filled; the row count is
    /// the maximum, never the minimum.
    pub fn row_count(&self) -> Result<usize> {
        self.columns
            .values()
            .map(Vec::len)
            .filter(|len| *len > 0)
            .max()
            .ok_or(Error::EmptyDataset)
    }

    /// Fail unless all columns have the same length
    pub fn validate_lengths(&self) -> Result<()> {
        check_lengths(&self.columns)
    }

    /// Pad a column with `value` up to the current row count
    ///
    /// Mutates the dataset in place. Returns the number of values appended;
    /// calling it again once lengths are equal appends nothing.
    pub fn fill(&mut self, column: &str, value: impl Into<Value>) -> Result<usize> {
        let target = self.row_count()?;
        let values = self
            .columns
            .get_mut(column)
            .ok_or_else(|| Error::unknown_column("dataset", column))?;

        let missing = target.saturating_sub(values.len());
        if missing > 0 {
            values.resize(target, value.into());
            tracing::debug!(column, appended = missing, "Filled column");
        }
        Ok(missing)
    }

    /// Infer the storage kind of every column
    pub fn column_kinds(&self) -> Result<IndexMap<String, ScalarKind>> {
        infer_columns(&self.columns)
    }

    /// Materialize rows with a strict coercer
    pub fn records(&self) -> Result<Vec<Record>> {
        self.records_with(&Coercer::new())
    }

    /// Materialize rows, coercing each column to its inferred kind
    ///
    /// Columns that are entirely null are left out, matching the columns
    /// the schema builder produces.
    pub fn records_with(&self, coercer: &Coercer) -> Result<Vec<Record>> {
        let kinds = self.column_kinds()?;
        self.records_as(&kinds, coercer)
    }

    /// Materialize rows using caller-supplied kinds
    pub fn records_as(
        &self,
        kinds: &IndexMap<String, ScalarKind>,
        coercer: &Coercer,
    ) -> Result<Vec<Record>> {
        self.validate_lengths()?;
        let row_count = self.row_count()?;

        let mut coerced: Vec<(&str, Vec<Value>)> = Vec::with_capacity(kinds.len());
        for (name, kind) in kinds {
            if !kind.is_persistable() {
                continue;
            }
            let values = self
                .columns
                .get(name)
                .ok_or_else(|| Error::unknown_column("dataset", name.as_str()))?;
            let values = coercer.coerce(values, *kind).in_column(name)?;
            coerced.push((name.as_str(), values));
        }

        let mut records: Vec<Record> = (0..row_count)
            .map(|_| Record::with_capacity(coerced.len()))
            .collect();
        for (name, values) in coerced {
            for (record, value) in records.iter_mut().zip(values) {
                record.insert(name.to_string(), value);
            }
        }
        Ok(records)
    }
}
