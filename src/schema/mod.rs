//! Type lattice and column kind inference
//!
//! # Features
//!
//! - **Closed kinds**: six persistable scalar kinds plus the `Null` placeholder
//! - **Promotion**: deterministic, order-independent widening of mixed columns
//! - **Structural classification**: typed values are never re-parsed from text

mod inference;
mod types;

pub use inference::{classify, infer, infer_columns};
pub(crate) use inference::classify_at;
pub use types::ScalarKind;
