//! Value coercion to a resolved column kind

use crate::error::{Error, Result};
use crate::schema::{classify_at, ScalarKind};
use crate::types::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Largest magnitude below which every integer is exactly representable as f64
const F64_EXACT_INT: i64 = 1 << 53;

/// Converts values to a target kind, failing on any loss of fidelity
///
/// The default coercer is strict: strings are never parsed into dates.
/// Parsing is opt-in through an explicit chrono format.
#[derive(Debug, Clone, Default)]
pub struct Coercer {
    /// Format for parsing strings into dates (opt-in)
    date_format: Option<String>,
    /// Format for parsing strings into datetimes (opt-in)
    datetime_format: Option<String>,
}

impl Coercer {
    /// Create a strict coercer
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow String -> Date coercion using the given chrono format
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Allow String -> DateTime coercion using the given chrono format
    #[must_use]
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = Some(format.into());
        self
    }

    /// Check if no relaxed parsing is enabled
    pub fn is_strict(&self) -> bool {
        self.date_format.is_none() && self.datetime_format.is_none()
    }

    /// Coerce every value to `target`, stopping at the first failure
    pub fn coerce(&self, values: &[Value], target: ScalarKind) -> Result<Vec<Value>> {
        values
            .iter()
            .enumerate()
            .map(|(index, value)| self.coerce_at(value, target, index))
            .collect()
    }

    /// Coerce a single value to `target`
    pub fn coerce_one(&self, value: &Value, target: ScalarKind) -> Result<Value> {
        self.coerce_at(value, target, 0)
    }

    /// Coerce a single value that sits at row `index` of its column
    ///
    /// The index is reported in any error.
    pub fn coerce_at(&self, value: &Value, target: ScalarKind, index: usize) -> Result<Value> {
        let from = classify_at(value, index)?;
        if from == ScalarKind::Null {
            return Ok(Value::Null);
        }
        if from == target {
            return Ok(value.clone());
        }

        let fail = || Error::Coercion {
            value: value.clone(),
            index,
            target,
        };
        let unsupported = || Error::UnsupportedCoercion {
            from,
            target,
            index,
        };

        match (target, value) {
            (ScalarKind::Null, _) => Err(unsupported()),

            (ScalarKind::Integer, Value::Boolean(b)) => Ok(Value::Integer(i64::from(*b))),
            (ScalarKind::Integer, Value::Float(x)) => {
                float_to_int(*x).map(Value::Integer).ok_or_else(fail)
            }
            (ScalarKind::Integer, Value::String(s)) => {
                s.trim().parse::<i64>().map(Value::Integer).map_err(|_| fail())
            }
            (ScalarKind::Integer, _) => Err(fail()),

            (ScalarKind::Float, Value::Boolean(b)) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            (ScalarKind::Float, Value::Integer(i)) => {
                int_to_float(*i).map(Value::Float).ok_or_else(fail)
            }
            (ScalarKind::Float, Value::String(s)) => {
                s.trim().parse::<f64>().map(Value::Float).map_err(|_| fail())
            }
            (ScalarKind::Float, _) => Err(fail()),

            (ScalarKind::String, _) => Ok(Value::String(value.to_string())),

            (ScalarKind::DateTime, Value::Date(d)) => Ok(Value::DateTime(d.and_time(NaiveTime::MIN))),
            (ScalarKind::Date, Value::String(s)) => match &self.date_format {
                Some(format) => NaiveDate::parse_from_str(s.trim(), format)
                    .map(Value::Date)
                    .map_err(|_| fail()),
                None => Err(unsupported()),
            },
            (ScalarKind::DateTime, Value::String(s)) => match &self.datetime_format {
                Some(format) => NaiveDateTime::parse_from_str(s.trim(), format)
                    .map(Value::DateTime)
                    .map_err(|_| fail()),
                None => Err(unsupported()),
            },
            (ScalarKind::Boolean | ScalarKind::Date | ScalarKind::DateTime, _) => {
                Err(unsupported())
            }
        }
    }
}

/// Coerce values with a strict coercer (convenience function)
pub fn coerce(values: &[Value], target: ScalarKind) -> Result<Vec<Value>> {
    Coercer::new().coerce(values, target)
}

/// Coerce a single value with a strict coercer (convenience function)
pub fn coerce_one(value: &Value, target: ScalarKind) -> Result<Value> {
    Coercer::new().coerce_one(value, target)
}

/// Convert a float with no fractional part that fits in i64
fn float_to_int(x: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range
    if x.is_finite() && x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}

/// Widen an integer to f64 only when no precision is lost
fn int_to_float(i: i64) -> Option<f64> {
    let x = i as f64;
    if (-F64_EXACT_INT..=F64_EXACT_INT).contains(&i) || x as i128 == i128::from(i) {
        Some(x)
    } else {
        None
    }
}
