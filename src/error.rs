//! Error types for data-to-table
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::schema::ScalarKind;
use crate::types::Value;
use thiserror::Error;

/// The main error type for data-to-table
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Inference Errors
    // ============================================================================
    #[error("Unsupported value type '{found}' at index {index}")]
    UnsupportedType { index: usize, found: &'static str },

    // ============================================================================
    // Coercion Errors
    // ============================================================================
    #[error("Cannot coerce {value:?} at index {index} to {target}")]
    Coercion {
        value: Value,
        index: usize,
        target: ScalarKind,
    },

    #[error("Coercion from {from} to {target} is not supported (index {index})")]
    UnsupportedCoercion {
        from: ScalarKind,
        target: ScalarKind,
        index: usize,
    },

    // ============================================================================
    // Normalization Errors
    // ============================================================================
    #[error("Column lengths differ: {}", format_lengths(.lengths))]
    LengthMismatch { lengths: Vec<(String, usize)> },

    #[error("Row {row} has keys [{}], expected [{}]", .found.join(", "), .expected.join(", "))]
    SchemaMismatch {
        row: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Dataset has no rows")]
    EmptyDataset,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    // ============================================================================
    // Schema Errors
    // ============================================================================
    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Table '{table}' is already defined with a different schema")]
    TableAlreadyDefined { table: String },

    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    // ============================================================================
    // Mapping / Storage Errors
    // ============================================================================
    #[error("Cannot map '{requested}': template is already mapped to '{current}'")]
    AlreadyMapped { current: String, requested: String },

    #[error("No table is mapped")]
    NotMapped,

    #[error("Referential integrity violation on '{table}': {message}")]
    ReferentialIntegrity { table: String, message: String },

    #[error("Constraint violation on '{table}': {message}")]
    ConstraintViolation { table: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Arrow/Parquet Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Context
    // ============================================================================
    #[error("Column '{column}': {source}")]
    InColumn {
        column: String,
        #[source]
        source: Box<Error>,
    },
}

fn format_lengths(lengths: &[(String, usize)]) -> String {
    lengths
        .iter()
        .map(|(name, len)| format!("{name}={len}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an unknown column error
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a referential integrity error
    pub fn referential(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReferentialIntegrity {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a constraint violation error
    pub fn constraint(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Attach the column name an error occurred in
    pub fn in_column(column: impl Into<String>, source: Error) -> Self {
        Self::InColumn {
            column: column.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, with any column context stripped
    pub fn root(&self) -> &Error {
        match self {
            Error::InColumn { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if the caller can fix this error by repairing its input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.root(),
            Error::UnsupportedType { .. }
                | Error::Coercion { .. }
                | Error::UnsupportedCoercion { .. }
                | Error::LengthMismatch { .. }
                | Error::SchemaMismatch { .. }
                | Error::EmptyDataset
                | Error::InvalidInput { .. }
        )
    }
}

/// Result type alias for data-to-table
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding column context to errors
pub trait ResultExt<T> {
    /// Tag an error with the column it occurred in
    fn in_column(self, column: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn in_column(self, column: &str) -> Result<T> {
        self.map_err(|e| Error::in_column(column, e))
    }
}
