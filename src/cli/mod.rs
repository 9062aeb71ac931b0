//! CLI module
//!
//! Command-line interface for loading JSON data into DuckDB tables.
//!
//! # Commands
//!
//! - `infer` - Print inferred column kinds
//! - `load` - Create a table from a data file and insert its rows
//! - `tables` - List tables in the database
//! - `describe` - Print a stored table's definition
//! - `drop` - Drop a table, optionally with its dependents
//! - `export` - Write a data file or stored table to Parquet

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{Runner, DEFAULT_DATABASE};
