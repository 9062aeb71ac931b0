//! CLI commands and argument parsing

use crate::output::ExportCompression;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Turn JSON data into typed database tables
#[derive(Parser, Debug)]
#[command(name = "data-to-table")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Load configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// DuckDB database file (overrides the config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the inferred column kinds of a JSON data file
    Infer {
        /// JSON file holding an object of columns or an array of rows
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Create a table from a JSON data file and insert its rows
    Load {
        /// JSON file holding an object of columns or an array of rows
        #[arg(short, long)]
        input: PathBuf,

        /// Target table (overrides the config)
        #[arg(short, long)]
        table: Option<String>,
    },

    /// List the tables in the database
    Tables,

    /// Print the definition of a stored table
    Describe {
        /// Table to describe
        table: String,
    },

    /// Drop a table
    Drop {
        /// Table to drop
        table: String,

        /// Also drop tables that reference it
        #[arg(long)]
        cascade: bool,
    },

    /// Write a JSON data file or a stored table to Parquet
    Export {
        /// JSON data file to export
        #[arg(short, long, conflicts_with = "table")]
        input: Option<PathBuf>,

        /// Stored table to export
        #[arg(short, long, required_unless_present = "input")]
        table: Option<String>,

        /// Parquet file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Column compression (overrides the config)
        #[arg(long, value_enum)]
        compression: Option<ExportCompression>,

        /// Rows per row group (overrides the config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        row_group_size: Option<u64>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
