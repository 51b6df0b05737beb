//! Composition utilities for building model stores.
//!
//! This module provides factory functions for wiring repositories to a
//! storage backend. It is focused purely on construction and should not
//! contain any domain logic.

use std::sync::Arc;

use sqlx::SqlitePool;

use memento_core::{Model, Settings};

use crate::setup::setup_database;
use crate::stores::{MemoryModelStore, SqliteModelStore};

/// Factory for creating model stores.
///
/// This struct provides composition utilities only, no domain logic.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a `SQLite` connection pool from settings.
    pub async fn create_pool(settings: &Settings) -> anyhow::Result<SqlitePool> {
        setup_database(settings).await
    }

    /// Create an in-memory `SQLite` pool for testing.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn create_test_pool() -> anyhow::Result<SqlitePool> {
        crate::setup::setup_test_database().await
    }

    /// Create a `SQLite` store for `M`, creating its table if needed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let pool = StoreFactory::create_pool(&settings).await?;
    /// let notes = StoreFactory::sqlite_store::<Note>(pool).await?;
    /// let repo = ModelRepository::new(ModelContext::new(notes), NotePolicy, localizer);
    /// ```
    pub async fn sqlite_store<M: Model>(
        pool: SqlitePool,
    ) -> anyhow::Result<Arc<SqliteModelStore<M>>> {
        let store = SqliteModelStore::new(pool)?;
        store.ensure_table().await?;
        Ok(Arc::new(store))
    }

    /// Create an empty in-memory store for `M`.
    pub fn memory_store<M: Model>() -> Arc<MemoryModelStore<M>> {
        Arc::new(MemoryModelStore::new())
    }
}

/// Test database helper for integration tests.
///
/// Provides an in-memory `SQLite` database that lives as long as the
/// helper. Tables are created on demand by [`TestDb::sqlite_store`].
#[cfg(any(test, feature = "test-utils"))]
pub struct TestDb {
    pool: SqlitePool,
}

#[cfg(any(test, feature = "test-utils"))]
impl TestDb {
    /// Create a new in-memory test database.
    pub async fn new() -> anyhow::Result<Self> {
        let pool = crate::setup::setup_test_database().await?;
        Ok(Self { pool })
    }

    /// Get the underlying pool.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a `SQLite` store for `M` using this test database.
    pub async fn sqlite_store<M: Model>(&self) -> anyhow::Result<Arc<SqliteModelStore<M>>> {
        StoreFactory::sqlite_store(self.pool.clone()).await
    }
}
