//! Schema builder module
//!
//! Turns inferred column kinds into column definitions and assembles them,
//! with a surrogate integer primary key and optional constraints, into a
//! named table definition.

mod builder;
mod types;

pub use builder::{build_columns, build_table, TableBuilder};
pub use types::{
    ColumnDefinition, ColumnModifier, ConstraintKind, TableConstraint, TableDefinition,
    DEFAULT_PRIMARY_KEY,
};

#[cfg(test)]
mod tests;
