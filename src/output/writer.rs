//! Parquet export of typed records
//!
//! Records are coerced and written one row group at a time, so a large
//! table never has to sit in a single Arrow batch.

use super::schema::{arrow_schema, records_to_batch_from};
use crate::error::Result;
use crate::schema::ScalarKind;
use crate::types::Record;
use indexmap::IndexMap;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Rows per row group unless configured otherwise
pub const DEFAULT_ROW_GROUP_SIZE: usize = 64 * 1024;

/// Column compression for exported files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportCompression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    Uncompressed,
}

impl From<ExportCompression> for Compression {
    fn from(compression: ExportCompression) -> Self {
        match compression {
            ExportCompression::Snappy => Compression::SNAPPY,
            ExportCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ExportCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ExportCompression::Uncompressed => Compression::UNCOMPRESSED,
        }
    }
}

/// How an export is laid out on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub compression: ExportCompression,
    pub row_group_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            compression: ExportCompression::default(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

impl ExportOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_compression(mut self, compression: ExportCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Set rows per row group; zero is treated as one
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    fn properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression.into())
            .set_max_row_group_size(self.row_group_size.max(1))
            .build()
    }
}

/// Write records as a Parquet file with one column per kind
///
/// Each chunk of `row_group_size` records becomes one batch. Coercion
/// errors report the record's position in `records`. Returns the number
/// of rows written.
pub fn write_parquet(
    path: impl AsRef<Path>,
    kinds: &IndexMap<String, ScalarKind>,
    records: &[Record],
    options: &ExportOptions,
) -> Result<usize> {
    let schema = Arc::new(arrow_schema(kinds));
    let file = File::create(path.as_ref())?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(options.properties()))?;

    let chunk = options.row_group_size.max(1);
    let mut written = 0;
    for rows in records.chunks(chunk) {
        let batch = records_to_batch_from(kinds, rows, written)?;
        writer.write(&batch)?;
        written += batch.num_rows();
    }

    writer.close()?;
    tracing::debug!(
        path = %path.as_ref().display(),
        rows = written,
        compression = ?options.compression,
        "Wrote Parquet file"
    );
    Ok(written)
}
