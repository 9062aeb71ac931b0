// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]

//! # data-to-table
//!
//! Infer relational table schemas from loosely structured data and load
//! the data into typed tables.
//!
//! ## Features
//!
//! - **Type Inference**: Resolve one storage kind per column from mixed values
//! - **Strict Coercion**: Convert values to their column kind without silent loss
//! - **Normalization**: Accept column-oriented or row-oriented input
//! - **Table Definitions**: Surrogate keys, modifiers, unique and foreign keys
//! - **DuckDB Storage**: Idempotent table creation, typed inserts, drop with cascade
//! - **Parquet Export**: Typed records to Arrow RecordBatches and Parquet files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use data_to_table::{load, Dataset, DuckDbBackend, SchemaMapper, TableSpec};
//!
//! let data = Dataset::from_json(
//!     serde_json::json!({"name": ["hi", "world"], "score": [1, 2.5]}),
//!     &Default::default(),
//! )?;
//! let mut mapper: SchemaMapper<DuckDbBackend> = SchemaMapper::connect("scores.duckdb")?;
//! let summary = load(&mut mapper, &data, &TableSpec::new("scores"))?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Load Pipeline                             │
//! │   normalize → infer → build table → map → create_all → insert    │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌────────────┬────────────┬─────┴──────┬─────────────┬─────────────┐
//! │  Dataset   │   Schema   │   Coerce   │    Table    │  Database   │
//! ├────────────┼────────────┼────────────┼─────────────┼─────────────┤
//! │ Columns    │ Lattice    │ Strict     │ Surrogate PK│ Mapper      │
//! │ Rows       │ Inference  │ Opt-in     │ Modifiers   │ DuckDB      │
//! │ Fill       │            │ dates      │ Constraints │ Memory      │
//! └────────────┴────────────┴────────────┴─────────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Raw values and type aliases
pub mod types;

/// Storage kind lattice and type inference
pub mod schema;

/// Value coercion
pub mod coerce;

/// Input normalization and the dataset facade
pub mod data;

/// Table definitions
pub mod table;

/// Storage backends and the schema mapper
pub mod database;

/// End-to-end load
pub mod pipeline;

/// YAML load configuration
pub mod config;

/// Arrow/Parquet output
pub mod output;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use coerce::{coerce, Coercer};
pub use config::{load_config, load_config_from_str, LoadConfig};
pub use data::{Dataset, NormalizeOptions, RawDataset};
pub use database::{DuckDbBackend, MemoryBackend, SchemaMapper, StorageBackend};
pub use pipeline::{load, LoadSummary, TableSpec};
pub use schema::{infer, ScalarKind};
pub use table::{build_columns, build_table, TableBuilder, TableDefinition};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
