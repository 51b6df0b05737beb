//! Model store trait definition.
//!
//! This port is the persistence backend behind a model context. It executes
//! [`ModelQuery`] descriptions and applies batches of changes atomically.

use async_trait::async_trait;

use crate::domain::{Change, Model, ModelQuery, QuerySource};

/// Storage backend for one model set.
///
/// # Design Rules
///
/// - `commit` is all-or-nothing: either every change is applied or none is
/// - Errors are returned as the backend produced them (no rewrapping)
/// - Returned models are owned values; nothing stays tracked
#[async_trait]
pub trait ModelStore<M: Model>: Send + Sync {
    /// Models matching the query, in the query's order.
    async fn fetch(&self, query: &ModelQuery) -> anyhow::Result<Vec<M>>;

    /// Number of models matching the query's conditions.
    ///
    /// Ordering and paging are ignored.
    async fn count(&self, query: &ModelQuery) -> anyhow::Result<u64>;

    /// Whether a model with this id exists.
    async fn exists(&self, id: i64) -> anyhow::Result<bool>;

    /// Apply every change in one transaction.
    ///
    /// Returns the inserted and updated models, in change order, with the
    /// ids assigned by the store.
    async fn commit(&self, changes: Vec<Change<M>>) -> anyhow::Result<Vec<M>>;
}

/// A query bound to the store that executes it.
///
/// This is how repository queries feed [`Page::create_async`](crate::Page::create_async):
/// the requested window replaces any paging set on the query.
pub struct BoundQuery<'a, M: Model> {
    store: &'a dyn ModelStore<M>,
    query: ModelQuery,
}

impl<'a, M: Model> BoundQuery<'a, M> {
    pub fn new(store: &'a dyn ModelStore<M>, query: ModelQuery) -> Self {
        Self { store, query }
    }

    pub const fn query(&self) -> &ModelQuery {
        &self.query
    }
}

#[async_trait]
impl<M: Model> QuerySource<M> for BoundQuery<'_, M> {
    async fn fetch_window(&self, offset: u64, limit: u64) -> anyhow::Result<Vec<M>> {
        let window = self.query.clone().skip(offset).take(limit);
        self.store.fetch(&window).await
    }

    async fn fetch_all(&self) -> anyhow::Result<Vec<M>> {
        self.store.fetch(&self.query).await
    }

    async fn count(&self) -> anyhow::Result<u64> {
        self.store.count(&self.query.clone().unpaged()).await
    }
}
