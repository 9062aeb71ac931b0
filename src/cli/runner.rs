//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, LoadConfig};
use crate::data::{Dataset, NormalizeOptions};
use crate::database::{DuckDbBackend, SchemaMapper};
use crate::error::{Error, Result};
use crate::output::{write_parquet, ExportCompression, ExportOptions};
use crate::pipeline;
use crate::schema::infer_columns;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Database used when neither the command line nor the config names one
pub const DEFAULT_DATABASE: &str = "data.duckdb";

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Infer { input } => self.infer(input, config.as_ref()),
            Commands::Load { input, table } => {
                self.load(input, table.as_deref(), config.as_ref())
            }
            Commands::Tables => self.tables(config.as_ref()),
            Commands::Describe { table } => self.describe(table, config.as_ref()),
            Commands::Drop { table, cascade } => {
                self.drop_table(table, *cascade, config.as_ref())
            }
            Commands::Export {
                input,
                table,
                output,
                compression,
                row_group_size,
            } => {
                let options = export_options(config.as_ref(), *compression, *row_group_size);
                self.export(
                    input.as_deref(),
                    table.as_deref(),
                    output,
                    &options,
                    config.as_ref(),
                )
            }
        }
    }

    /// Load the YAML config, if one was given
    fn load_config(&self) -> Result<Option<LoadConfig>> {
        self.cli.config.as_ref().map(load_config).transpose()
    }

    /// Database location: flag, then config, then the default file
    fn database(&self, config: Option<&LoadConfig>) -> String {
        self.cli
            .database
            .clone()
            .or_else(|| config.and_then(|c| c.database.clone()))
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
    }

    fn connect(&self, config: Option<&LoadConfig>) -> Result<SchemaMapper<DuckDbBackend>> {
        let location = self.database(config);
        tracing::debug!(database = %location, "Connecting");
        SchemaMapper::connect(&location)
    }

    /// Read a JSON data file and apply the configured fills
    ///
    /// Lengths are validated after filling, so a fill can repair a short
    /// column.
    fn read_dataset(&self, path: &Path, config: Option<&LoadConfig>) -> Result<Dataset> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read data file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let json: Value = serde_json::from_str(&content)?;

        let mut dataset = Dataset::from_json(json, &NormalizeOptions::new())?;

        if let Some(config) = config {
            for (column, value) in config.fill_values() {
                let added = dataset.fill(column, value)?;
                if added > 0 {
                    tracing::info!(column, added, "Filled column");
                }
            }
            if config.normalize_options().validate_lengths {
                dataset.validate_lengths()?;
            }
        }
        Ok(dataset)
    }

    fn infer(&self, input: &Path, config: Option<&LoadConfig>) -> Result<()> {
        let dataset = self.read_dataset(input, config)?;
        let kinds = dataset.column_kinds()?;

        self.output_message(&json!({
            "type": "SCHEMA",
            "rows": dataset.row_count().unwrap_or(0),
            "columns": kinds,
        }));
        Ok(())
    }

    fn load(&self, input: &Path, table: Option<&str>, config: Option<&LoadConfig>) -> Result<()> {
        let mut effective = match (config, table) {
            (Some(config), _) => config.clone(),
            (None, Some(table)) => LoadConfig::for_table(table),
            (None, None) => {
                return Err(Error::config("A table name is required (--table or --config)"))
            }
        };
        if let Some(table) = table {
            effective.table.name = table.to_string();
        }

        let dataset = self.read_dataset(input, Some(&effective))?;
        let mut mapper = self.connect(Some(&effective))?;
        let summary = pipeline::load(&mut mapper, &dataset, &effective.table_spec())?;

        self.output_message(&json!({
            "type": "LOAD",
            "summary": summary,
        }));
        Ok(())
    }

    fn tables(&self, config: Option<&LoadConfig>) -> Result<()> {
        let mapper = self.connect(config)?;
        let tables = mapper.tables()?;

        self.output_message(&json!({
            "type": "TABLES",
            "database": mapper.backend().location(),
            "tables": tables,
        }));
        Ok(())
    }

    fn describe(&self, table: &str, config: Option<&LoadConfig>) -> Result<()> {
        let mut mapper = self.connect(config)?;
        let definition = mapper.reflect_table(table)?;

        self.output_message(&json!({
            "type": "TABLE",
            "database": mapper.backend().location(),
            "table": definition,
        }));
        Ok(())
    }

    fn drop_table(&self, table: &str, cascade: bool, config: Option<&LoadConfig>) -> Result<()> {
        let mut mapper = self.connect(config)?;
        mapper.drop(table, cascade)?;

        self.output_message(&json!({
            "type": "DROP",
            "table": table,
            "cascade": cascade,
        }));
        Ok(())
    }

    fn export(
        &self,
        input: Option<&Path>,
        table: Option<&str>,
        output: &Path,
        options: &ExportOptions,
        config: Option<&LoadConfig>,
    ) -> Result<()> {
        let (kinds, records) = match (input, table) {
            (Some(input), _) => {
                let dataset = self.read_dataset(input, config)?;
                let kinds = dataset.column_kinds()?;
                let coercer = config.map(|c| c.table.coercer()).unwrap_or_default();
                let records = dataset.records_as(&kinds, &coercer)?;
                (kinds, records)
            }
            (None, Some(table)) => {
                let mapper = self.connect(config)?;
                let records = mapper.backend().select_all(table)?;
                let dataset = Dataset::new(records)?;
                let kinds = infer_columns(dataset.columns())?;
                let records = dataset.records_as(&kinds, &Default::default())?;
                (kinds, records)
            }
            (None, None) => return Err(Error::config("Nothing to export (--input or --table)")),
        };

        let rows = write_parquet(output, &kinds, &records, options)?;
        tracing::info!(path = %output.display(), rows, "Wrote Parquet file");

        self.output_message(&json!({
            "type": "EXPORT",
            "path": output.display().to_string(),
            "rows": rows,
            "compression": options.compression,
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Export layout: config first, then command-line overrides
fn export_options(
    config: Option<&LoadConfig>,
    compression: Option<ExportCompression>,
    row_group_size: Option<u64>,
) -> ExportOptions {
    let mut options = config.map(|c| c.export.clone()).unwrap_or_default();
    if let Some(compression) = compression {
        options = options.with_compression(compression);
    }
    if let Some(size) = row_group_size {
        options = options.with_row_group_size(usize::try_from(size).unwrap_or(usize::MAX));
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_options_prefer_flags_over_config() {
        let mut config = LoadConfig::for_table("t");
        config.export = ExportOptions::new()
            .with_compression(ExportCompression::Gzip)
            .with_row_group_size(10);

        let from_config = export_options(Some(&config), None, None);
        assert_eq!(from_config, config.export);

        let overridden = export_options(Some(&config), Some(ExportCompression::Zstd), Some(3));
        assert_eq!(overridden.compression, ExportCompression::Zstd);
        assert_eq!(overridden.row_group_size, 3);

        assert_eq!(export_options(None, None, None), ExportOptions::default());
    }
}
