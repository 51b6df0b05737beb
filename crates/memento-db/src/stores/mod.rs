//! `ModelStore` implementations.
//!
//! - `MemoryModelStore` - documents in a map, for tests and prototypes
//! - `SqliteModelStore` - one JSON-document table per model set

pub mod document;
mod memory_model_store;
mod sqlite_model_store;

pub use memory_model_store::MemoryModelStore;
pub use sqlite_model_store::SqliteModelStore;
