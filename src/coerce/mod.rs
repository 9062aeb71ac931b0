//! Value coercion module
//!
//! Converts a column's values to its resolved storage kind.
//!
//! # Rules
//!
//! - **Integer**: floats only when the fractional part is zero; strings must be integer literals
//! - **Float**: integers widen exactly; strings must be float literals
//! - **String**: canonical text form for every kind
//! - **Boolean / Date / DateTime**: same-kind passthrough only, unless a date format is opted in
//! - **Null**: passes through for every target

mod coercer;

pub use coercer::{coerce, coerce_one, Coercer};
