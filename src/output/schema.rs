//! Typed records to Arrow RecordBatches
//!
//! Column kinds map onto Arrow types one to one; the batch keeps the
//! column order of the kind map.

use crate::coerce::Coercer;
use crate::error::{Result, ResultExt};
use crate::schema::ScalarKind;
use crate::types::{Record, Value};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, NullArray, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, NaiveDate};
use indexmap::IndexMap;
use std::sync::Arc;

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Arrow type for a storage kind
pub fn arrow_type(kind: ScalarKind) -> DataType {
    match kind {
        ScalarKind::Null => DataType::Null,
        ScalarKind::Boolean => DataType::Boolean,
        ScalarKind::Integer => DataType::Int64,
        ScalarKind::Float => DataType::Float64,
        ScalarKind::String => DataType::Utf8,
        ScalarKind::Date => DataType::Date32,
        ScalarKind::DateTime => DataType::Timestamp(TimeUnit::Microsecond, None),
    }
}

/// Arrow schema for a set of column kinds; every field is nullable
pub fn arrow_schema(kinds: &IndexMap<String, ScalarKind>) -> Schema {
    let fields: Vec<Field> = kinds
        .iter()
        .map(|(name, kind)| Field::new(name, arrow_type(*kind), true))
        .collect();
    Schema::new(fields)
}

/// Convert records to a RecordBatch with one column per kind
///
/// Missing keys become nulls. Values are coerced to their column's kind,
/// so a value that does not fit fails the conversion.
pub fn records_to_batch(
    kinds: &IndexMap<String, ScalarKind>,
    records: &[Record],
) -> Result<RecordBatch> {
    records_to_batch_from(kinds, records, 0)
}

/// Convert a slice of records that starts at row `first_row` of a larger set
pub(crate) fn records_to_batch_from(
    kinds: &IndexMap<String, ScalarKind>,
    records: &[Record],
    first_row: usize,
) -> Result<RecordBatch> {
    let schema = Arc::new(arrow_schema(kinds));

    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let coercer = Coercer::new();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(kinds.len());
    for (name, kind) in kinds {
        let values = records
            .iter()
            .enumerate()
            .map(|(offset, record)| match record.get(name) {
                Some(value) => coercer.coerce_at(value, *kind, first_row + offset),
                None => Ok(Value::Null),
            })
            .collect::<Result<Vec<_>>>()
            .in_column(name)?;
        columns.push(build_array(&values, *kind));
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Build an Arrow array from values already coerced to `kind`
fn build_array(values: &[Value], kind: ScalarKind) -> ArrayRef {
    match kind {
        ScalarKind::Null => Arc::new(NullArray::new(values.len())),

        ScalarKind::Boolean => {
            let arr: BooleanArray = values
                .iter()
                .map(|v| match v {
                    Value::Boolean(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Arc::new(arr)
        }

        ScalarKind::Integer => {
            let arr: Int64Array = values
                .iter()
                .map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect();
            Arc::new(arr)
        }

        ScalarKind::Float => {
            let arr: Float64Array = values
                .iter()
                .map(|v| match v {
                    Value::Float(x) => Some(*x),
                    _ => None,
                })
                .collect();
            Arc::new(arr)
        }

        ScalarKind::String => {
            let arr: StringArray = values
                .iter()
                .map(|v| match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect();
            Arc::new(arr)
        }

        ScalarKind::Date => {
            let arr: Date32Array = values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                    _ => None,
                })
                .collect();
            Arc::new(arr)
        }

        ScalarKind::DateTime => {
            let arr: TimestampMicrosecondArray = values
                .iter()
                .map(|v| match v {
                    Value::DateTime(dt) => Some(dt.and_utc().timestamp_micros()),
                    _ => None,
                })
                .collect();
            Arc::new(arr)
        }
    }
}

/// Convert a RecordBatch written by [`records_to_batch`] back to records
pub fn batch_to_records(batch: &RecordBatch) -> Vec<Record> {
    let schema = batch.schema();
    (0..batch.num_rows())
        .map(|row| {
            schema
                .fields()
                .iter()
                .zip(batch.columns())
                .map(|(field, column)| (field.name().clone(), array_value(column.as_ref(), row)))
                .collect()
        })
        .collect()
}

fn array_value(array: &dyn Array, row: usize) -> Value {
    if array.is_null(row) {
        return Value::Null;
    }
    let any = array.as_any();

    match array.data_type() {
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map_or(Value::Null, |a| Value::Boolean(a.value(row))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map_or(Value::Null, |a| Value::Integer(a.value(row))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map_or(Value::Null, |a| Value::Float(a.value(row))),
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map_or(Value::Null, |a| Value::String(a.value(row).to_string())),
        DataType::Date32 => any
            .downcast_ref::<Date32Array>()
            .and_then(|a| {
                NaiveDate::from_num_days_from_ce_opt(a.value(row) + UNIX_EPOCH_DAYS_FROM_CE)
            })
            .map_or(Value::Null, Value::Date),
        DataType::Timestamp(TimeUnit::Microsecond, _) => any
            .downcast_ref::<TimestampMicrosecondArray>()
            .and_then(|a| DateTime::from_timestamp_micros(a.value(row)))
            .map_or(Value::Null, |dt| Value::DateTime(dt.naive_utc())),
        _ => Value::Null,
    }
}
