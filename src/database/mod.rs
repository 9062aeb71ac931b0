//! Storage support
//!
//! A [`SchemaMapper`] owns a [`StorageBackend`] and the registry of table
//! definitions created through it. DuckDB is the persistent backend; the
//! in-memory backend serves tests and dry runs.

mod backend;
mod engine;
mod mapper;
mod memory;

pub use backend::StorageBackend;
pub use engine::{DuckDbBackend, MEMORY_LOCATION};
pub use mapper::SchemaMapper;
pub use memory::MemoryBackend;
