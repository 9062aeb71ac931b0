//! Load configuration
//!
//! A load config names the target table and shapes it: primary key,
//! per-column modifiers, table constraints, and opt-in date formats.
//!
//! ```yaml
//! database: warehouse.duckdb
//! table:
//!   name: players
//!   validate_lengths: true
//!   date_format: "%Y-%m-%d"
//!   fill:
//!     team_id: null
//!   columns:
//!     name:
//!       - type: not_null
//!     team_id:
//!       - type: references
//!         table: teams
//!   constraints:
//!     - type: unique
//!       columns: [name, joined]
//! export:
//!   compression: zstd
//!   row_group_size: 10000
//! ```

use crate::coerce::Coercer;
use crate::data::NormalizeOptions;
use crate::error::{Error, Result};
use crate::output::ExportOptions;
use crate::pipeline::TableSpec;
use crate::table::{ColumnModifier, TableConstraint, DEFAULT_PRIMARY_KEY};
use crate::types::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// Top-Level Load Config
// ============================================================================

/// Complete load configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Database file; the command line may override it
    #[serde(default)]
    pub database: Option<String>,

    /// Target table
    pub table: TableConfig,

    /// Parquet export layout
    #[serde(default)]
    pub export: ExportOptions,
}

impl LoadConfig {
    /// Config for a table with no extra shaping
    pub fn for_table(name: impl Into<String>) -> Self {
        Self {
            database: None,
            table: TableConfig::new(name),
            export: ExportOptions::default(),
        }
    }

    /// Table spec for the load pipeline
    pub fn table_spec(&self) -> TableSpec {
        let table = &self.table;
        let mut spec = TableSpec::new(table.name.clone()).with_coercer(table.coercer());
        if let Some(primary_key) = &table.primary_key {
            spec = spec.with_primary_key(primary_key.clone());
        }
        for (column, modifiers) in &table.columns {
            for modifier in modifiers {
                spec = spec.with_modifier(column.clone(), modifier.clone().into());
            }
        }
        for constraint in &table.constraints {
            spec = spec.with_constraint(constraint.clone().into());
        }
        spec
    }

    /// Normalization options for the input data
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::new().with_validate_lengths(self.table.validate_lengths)
    }

    /// Columns to pad before loading, with their fill values
    pub fn fill_values(&self) -> impl Iterator<Item = (&str, Value)> {
        self.table
            .fill
            .iter()
            .map(|(column, value)| (column.as_str(), Value::from(value.clone())))
    }
}

// ============================================================================
// Table Config
// ============================================================================

/// Target table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Surrogate key column name (defaults to `id`)
    #[serde(default)]
    pub primary_key: Option<String>,

    /// Reject input whose columns differ in length
    #[serde(default)]
    pub validate_lengths: bool,

    /// chrono format for parsing strings into dates
    #[serde(default)]
    pub date_format: Option<String>,

    /// chrono format for parsing strings into datetimes
    #[serde(default)]
    pub datetime_format: Option<String>,

    /// Columns padded to the longest column's length
    #[serde(default)]
    pub fill: IndexMap<String, serde_json::Value>,

    /// Per-column modifiers
    #[serde(default)]
    pub columns: IndexMap<String, Vec<ModifierConfig>>,

    /// Table-level constraints
    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,
}

impl TableConfig {
    /// Config naming just the table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            validate_lengths: false,
            date_format: None,
            datetime_format: None,
            fill: IndexMap::new(),
            columns: IndexMap::new(),
            constraints: Vec::new(),
        }
    }

    /// Coercer honoring the configured date formats
    pub fn coercer(&self) -> Coercer {
        let mut coercer = Coercer::new();
        if let Some(format) = &self.date_format {
            coercer = coercer.with_date_format(format.clone());
        }
        if let Some(format) = &self.datetime_format {
            coercer = coercer.with_datetime_format(format.clone());
        }
        coercer
    }
}

/// Column modifier as written in YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierConfig {
    PrimaryKey,
    NotNull,
    Unique,
    Default {
        value: serde_json::Value,
    },
    References {
        table: String,
        /// Referenced column (defaults to `id`)
        #[serde(default = "default_reference_column")]
        column: String,
    },
}

fn default_reference_column() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

impl From<ModifierConfig> for ColumnModifier {
    fn from(config: ModifierConfig) -> Self {
        match config {
            ModifierConfig::PrimaryKey => ColumnModifier::PrimaryKey,
            ModifierConfig::NotNull => ColumnModifier::NotNull,
            ModifierConfig::Unique => ColumnModifier::Unique,
            ModifierConfig::Default { value } => ColumnModifier::Default(value.into()),
            ModifierConfig::References { table, column } => {
                ColumnModifier::References { table, column }
            }
        }
    }
}

/// Table constraint as written in YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintConfig {
    Unique {
        columns: Vec<String>,
    },
    ForeignKey {
        columns: Vec<String>,
        table: String,
        references: Vec<String>,
    },
}

impl From<ConstraintConfig> for TableConstraint {
    fn from(config: ConstraintConfig) -> Self {
        match config {
            ConstraintConfig::Unique { columns } => TableConstraint::unique(columns),
            ConstraintConfig::ForeignKey {
                columns,
                table,
                references,
            } => TableConstraint::foreign_key(columns, table, references),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load a config from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<LoadConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_config_from_str(&content)
}

/// Load a config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<LoadConfig> {
    let config: LoadConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse load config YAML: {e}")))?;

    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &LoadConfig) -> Result<()> {
    let table = &config.table;
    if table.name.is_empty() {
        return Err(Error::config("Table name cannot be empty"));
    }
    if table.primary_key.as_deref() == Some("") {
        return Err(Error::config("Primary key name cannot be empty"));
    }
    if config.export.row_group_size == 0 {
        return Err(Error::config("Export row group size must be positive"));
    }

    for constraint in &table.constraints {
        match constraint {
            ConstraintConfig::Unique { columns } if columns.is_empty() => {
                return Err(Error::config("Unique constraint must name columns"));
            }
            ConstraintConfig::ForeignKey {
                columns,
                references,
                table: parent,
            } => {
                if columns.is_empty() || columns.len() != references.len() {
                    return Err(Error::config(format!(
                        "Foreign key into '{parent}' must pair each column with a referenced column"
                    )));
                }
            }
            ConstraintConfig::Unique { .. } => {}
        }
    }

    Ok(())
}
