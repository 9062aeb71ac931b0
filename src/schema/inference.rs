//! Column kind inference from observed values

use super::types::ScalarKind;
use crate::error::{Error, Result, ResultExt};
use crate::types::{ColumnMap, Value};
use indexmap::IndexMap;

/// Classify a single value by its structural kind
///
/// Already-typed values keep their kind: a `Value::Date` is a Date and a
/// `Value::String` is a String even when its text looks like a date.
pub fn classify(value: &Value) -> Option<ScalarKind> {
    match value {
        Value::Null => Some(ScalarKind::Null),
        Value::Boolean(_) => Some(ScalarKind::Boolean),
        Value::Integer(_) => Some(ScalarKind::Integer),
        Value::Float(_) => Some(ScalarKind::Float),
        Value::String(_) => Some(ScalarKind::String),
        Value::Date(_) => Some(ScalarKind::Date),
        Value::DateTime(_) => Some(ScalarKind::DateTime),
        Value::List(_) | Value::Object(_) => None,
    }
}

/// Classify a value at a known position, failing on nested containers
pub(crate) fn classify_at(value: &Value, index: usize) -> Result<ScalarKind> {
    classify(value).ok_or(Error::UnsupportedType {
        index,
        found: value.type_name(),
    })
}

/// Infer the single storage kind for a column of values
///
/// Returns `ScalarKind::Null` when the column is empty or entirely null;
/// callers skip column creation in that case.
pub fn infer(values: &[Value]) -> Result<ScalarKind> {
    let mut kind = ScalarKind::Null;
    for (index, value) in values.iter().enumerate() {
        let observed = classify_at(value, index)?;
        let promoted = kind.promote(observed);
        if promoted == ScalarKind::String && kind.is_persistable() && kind != observed {
            tracing::debug!(from = %kind, observed = %observed, index, "Promoting to string");
        }
        kind = promoted;
    }
    Ok(kind)
}

/// Infer the storage kind of every column, preserving column order
pub fn infer_columns(columns: &ColumnMap) -> Result<IndexMap<String, ScalarKind>> {
    columns
        .iter()
        .map(|(name, values)| {
            let kind = infer(values).in_column(name)?;
            if kind == ScalarKind::Null {
                tracing::warn!(column = %name, "Column has no non-null values");
            }
            Ok((name.clone(), kind))
        })
        .collect()
}
