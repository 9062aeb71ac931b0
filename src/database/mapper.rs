//! Schema mapper
//!
//! Keeps a registry of table definitions, binds one of them at a time as
//! the target for typed inserts, and materializes the registry against a
//! storage backend.

use super::backend::StorageBackend;
use crate::coerce::Coercer;
use crate::error::{Error, Result, ResultExt};
use crate::table::TableDefinition;
use crate::types::Record;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};

/// Binds table definitions to a storage backend
pub struct SchemaMapper<B: StorageBackend> {
    backend: B,
    /// Every table defined through this mapper, in definition order
    metadata: IndexMap<String, TableDefinition>,
    /// Name of the table the insert template is bound to
    mapped: Option<String>,
    coercer: Coercer,
}

impl<B: StorageBackend> SchemaMapper<B> {
    /// Wrap an open backend
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            metadata: IndexMap::new(),
            mapped: None,
            coercer: Coercer::new(),
        }
    }

    /// Connect a backend at `location` and wrap it
    pub fn connect(location: &str) -> Result<Self> {
        B::connect(location).map(Self::new)
    }

    /// Use a non-default coercer for inserts
    #[must_use]
    pub fn with_coercer(mut self, coercer: Coercer) -> Self {
        self.coercer = coercer;
        self
    }

    /// The underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register a table definition without binding it
    ///
    /// Registering an identical definition twice is a no-op; a different
    /// definition under a registered name fails.
    pub fn define(&mut self, table: TableDefinition) -> Result<()> {
        match self.metadata.get(&table.name) {
            Some(existing) if *existing == table => Ok(()),
            Some(_) => Err(Error::TableAlreadyDefined { table: table.name }),
            None => {
                tracing::debug!(table = %table.name, "Registered table definition");
                self.metadata.insert(table.name.clone(), table);
                Ok(())
            }
        }
    }

    /// Register a definition and bind the insert template to it
    pub fn map(&mut self, table: TableDefinition) -> Result<()> {
        if let Some(current) = &self.mapped {
            return Err(Error::AlreadyMapped {
                current: current.clone(),
                requested: table.name,
            });
        }
        let name = table.name.clone();
        self.define(table)?;
        tracing::debug!(table = %name, "Mapped table");
        self.mapped = Some(name);
        Ok(())
    }

    /// Release the binding, keeping the definition registered
    pub fn clear(&mut self) -> Option<String> {
        let released = self.mapped.take();
        if let Some(name) = &released {
            tracing::debug!(table = %name, "Cleared mapping");
        }
        released
    }

    /// The definition the template is bound to, if any
    pub fn mapped(&self) -> Option<&TableDefinition> {
        self.mapped.as_ref().and_then(|name| self.metadata.get(name))
    }

    /// A registered definition
    pub fn definition(&self, name: &str) -> Option<&TableDefinition> {
        self.metadata.get(name)
    }

    /// Definition of a table, registered or read back from the store
    ///
    /// A stored table that this mapper has not seen is registered, so it
    /// can be mapped and takes part in `drop` and `create_all`.
    pub fn reflect_table(&mut self, name: &str) -> Result<TableDefinition> {
        if let Some(table) = self.metadata.get(name) {
            return Ok(table.clone());
        }
        let table = self.backend.describe(name)?;
        tracing::debug!(table = %name, columns = table.columns.len(), "Reflected stored table");
        self.metadata.insert(name.to_string(), table.clone());
        Ok(table)
    }

    /// Bind the insert template to a table that already exists in the store
    pub fn map_existing(&mut self, name: &str) -> Result<()> {
        let table = self.reflect_table(name)?;
        self.map(table)
    }

    /// Register every stored table the registry does not know yet
    ///
    /// Returns the newly registered names.
    pub fn automap(&mut self) -> Result<Vec<String>> {
        let mut registered = Vec::new();
        for name in self.backend.reflect()? {
            if !self.metadata.contains_key(&name) {
                self.reflect_table(&name)?;
                registered.push(name);
            }
        }
        Ok(registered)
    }

    /// Insert one record into the mapped table
    ///
    /// Keys must name columns of the table. Values are coerced to the
    /// column kinds before they reach the backend.
    pub fn insert(&mut self, record: &Record) -> Result<()> {
        self.insert_at(record, 0)
    }

    /// Insert records in order, stopping at the first failure
    ///
    /// Coercion errors report the position of the failing record.
    pub fn insert_all(&mut self, records: &[Record]) -> Result<usize> {
        for (index, record) in records.iter().enumerate() {
            self.insert_at(record, index)?;
        }
        if let Some(table) = &self.mapped {
            tracing::debug!(table = %table, rows = records.len(), "Inserted records");
        }
        Ok(records.len())
    }

    fn insert_at(&mut self, record: &Record, index: usize) -> Result<()> {
        let table = self.mapped().ok_or(Error::NotMapped)?;

        let mut typed = Record::with_capacity(record.len());
        for (key, value) in record {
            let column = table
                .column(key)
                .ok_or_else(|| Error::unknown_column(&table.name, key.as_str()))?;
            let value = self
                .coercer
                .coerce_at(value, column.kind, index)
                .in_column(&column.name)?;
            typed.insert(key.clone(), value);
        }

        let name = table.name.clone();
        self.backend.execute_insert(&name, &typed)
    }

    /// Check if a table is present in the store
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.backend.reflect()?.contains(name))
    }

    /// Names of the tables present in the store
    pub fn tables(&self) -> Result<BTreeSet<String>> {
        self.backend.reflect()
    }

    /// Create every registered table not yet in the store
    ///
    /// Referenced tables are created before the tables referencing them.
    /// Returns the names created by this call.
    pub fn create_all(&mut self) -> Result<Vec<String>> {
        let existing = self.backend.reflect()?;
        let mut created = Vec::new();

        for name in self.creation_order() {
            if existing.contains(&name) {
                continue;
            }
            let Some(table) = self.metadata.get(&name) else {
                continue;
            };
            self.backend.execute_ddl(table)?;
            tracing::info!(table = %name, "Created table");
            created.push(name);
        }

        Ok(created)
    }

    /// Registered table names, parents before children
    ///
    /// Definition order is kept where references allow it. Cycles fall
    /// back to definition order.
    fn creation_order(&self) -> Vec<String> {
        let mut ordered = Vec::with_capacity(self.metadata.len());
        let mut placed: HashSet<&str> = HashSet::with_capacity(self.metadata.len());

        while placed.len() < self.metadata.len() {
            let ready = self.metadata.values().find(|t| {
                !placed.contains(t.name.as_str())
                    && t.referenced_tables().iter().all(|parent| {
                        placed.contains(parent) || !self.metadata.contains_key(*parent)
                    })
            });
            let next = ready.or_else(|| {
                self.metadata
                    .values()
                    .find(|t| !placed.contains(t.name.as_str()))
            });
            let Some(table) = next else {
                break;
            };
            placed.insert(table.name.as_str());
            ordered.push(table.name.clone());
        }

        ordered
    }

    /// Drop a table
    ///
    /// Fails with a referential integrity error if other existing tables
    /// reference it, unless `cascade` is set, in which case those tables
    /// are dropped first. The definition is removed from the registry.
    pub fn drop(&mut self, name: &str, cascade: bool) -> Result<()> {
        let existing = self.backend.reflect()?;
        if !existing.contains(name) && !self.metadata.contains_key(name) {
            return Err(Error::TableNotFound {
                table: name.to_string(),
            });
        }

        let mut visited = HashSet::new();
        self.drop_recursive(name, cascade, &existing, &mut visited)
    }

    fn drop_recursive(
        &mut self,
        name: &str,
        cascade: bool,
        existing: &BTreeSet<String>,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }

        let dependents: Vec<String> = self
            .metadata
            .values()
            .filter(|t| existing.contains(&t.name) && t.references_table(name))
            .map(|t| t.name.clone())
            .filter(|dependent| !visited.contains(dependent))
            .collect();

        if !dependents.is_empty() {
            if !cascade {
                return Err(Error::referential(
                    name,
                    format!("table is referenced by {}", dependents.join(", ")),
                ));
            }
            for dependent in &dependents {
                self.drop_recursive(dependent, true, existing, visited)?;
            }
        }

        self.backend.drop_table(name, cascade)?;
        self.metadata.shift_remove(name);
        if self.mapped.as_deref() == Some(name) {
            self.mapped = None;
        }
        tracing::info!(table = %name, "Dropped table");
        Ok(())
    }
}
