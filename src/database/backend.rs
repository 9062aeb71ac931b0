//! Storage backend abstraction

use crate::error::Result;
use crate::table::TableDefinition;
use crate::types::Record;
use std::collections::BTreeSet;

/// A relational store that can hold tables built from table definitions
///
/// Implementations own their connection. Creation is idempotent: issuing
/// DDL for a table that already exists leaves it untouched.
pub trait StorageBackend {
    /// Open a connection to the store at `location`
    fn connect(location: &str) -> Result<Self>
    where
        Self: Sized;

    /// Names of the tables currently present in the store
    fn reflect(&self) -> Result<BTreeSet<String>>;

    /// Read the definition of a stored table back from the store
    fn describe(&self, table: &str) -> Result<TableDefinition>;

    /// Create the table if it does not exist
    fn execute_ddl(&mut self, table: &TableDefinition) -> Result<()>;

    /// Insert one record; omitted columns take their default or null
    fn execute_insert(&mut self, table: &str, record: &Record) -> Result<()>;

    /// Drop the table if it exists
    fn drop_table(&mut self, table: &str, cascade: bool) -> Result<()>;
}
