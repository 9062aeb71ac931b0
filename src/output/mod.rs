//! Output module
//!
//! Converts typed records to Arrow RecordBatches and exports them as
//! Parquet files.

mod schema;
mod writer;

pub use schema::{arrow_schema, arrow_type, batch_to_records, records_to_batch};
pub use writer::{write_parquet, ExportCompression, ExportOptions, DEFAULT_ROW_GROUP_SIZE};
