//! In-memory implementation of the `ModelStore` trait.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use memento_core::{Change, Model, ModelQuery, ModelStore};

use super::document;

#[derive(Debug, Clone)]
struct MemoryState {
    documents: BTreeMap<i64, Value>,
    next_id: i64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            documents: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// In-memory implementation of the `ModelStore` trait.
///
/// Models are kept as JSON documents keyed by id. A commit is applied to a
/// copy of the current state and swapped in only when every change
/// succeeded, so a failed commit leaves the store untouched.
pub struct MemoryModelStore<M> {
    state: RwLock<MemoryState>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Default for MemoryModelStore<M> {
    fn default() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            _model: PhantomData,
        }
    }
}

impl<M: Model> MemoryModelStore<M> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored models.
    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn to_document(model: &M, id: i64) -> anyhow::Result<Value> {
        let mut document = serde_json::to_value(model)
            .with_context(|| format!("Failed to serialize {} model", M::SET_NAME))?;
        let Value::Object(fields) = &mut document else {
            bail!("{} models must serialize to a JSON object", M::SET_NAME);
        };
        fields.insert("id".to_string(), Value::from(id));
        Ok(document)
    }

    fn from_document(document: Value) -> anyhow::Result<M> {
        serde_json::from_value(document)
            .with_context(|| format!("Failed to deserialize {} model", M::SET_NAME))
    }
}

#[async_trait]
impl<M: Model> ModelStore<M> for MemoryModelStore<M> {
    async fn fetch(&self, query: &ModelQuery) -> anyhow::Result<Vec<M>> {
        let mut documents: Vec<(i64, Value)> = {
            let state = self.state.read().await;
            state
                .documents
                .iter()
                .filter(|(_, document)| document::matches_all(document, query))
                .map(|(id, document)| (*id, document.clone()))
                .collect()
        };

        document::sort(&mut documents, query.ordering());

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = query
            .limit()
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        documents
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, mut document)| {
                document::project(&mut document, query.excluded());
                Self::from_document(document)
            })
            .collect()
    }

    async fn count(&self, query: &ModelQuery) -> anyhow::Result<u64> {
        let state = self.state.read().await;
        let count = state
            .documents
            .values()
            .filter(|document| document::matches_all(document, query))
            .count();
        Ok(count as u64)
    }

    async fn exists(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.state.read().await.documents.contains_key(&id))
    }

    async fn commit(&self, changes: Vec<Change<M>>) -> anyhow::Result<Vec<M>> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let mut saved = Vec::new();

        for change in changes {
            match change {
                Change::Insert(model) => {
                    let id = staged.next_id;
                    staged.next_id += 1;
                    let document = Self::to_document(&model, id)?;
                    staged.documents.insert(id, document.clone());
                    saved.push(Self::from_document(document)?);
                }
                Change::Update(model) => {
                    let id = model.id();
                    if !staged.documents.contains_key(&id) {
                        bail!("{} {id} does not exist", M::SET_NAME);
                    }
                    let document = Self::to_document(&model, id)?;
                    staged.documents.insert(id, document.clone());
                    saved.push(Self::from_document(document)?);
                }
                Change::Delete(id) => {
                    if staged.documents.remove(&id).is_none() {
                        bail!("{} {id} does not exist", M::SET_NAME);
                    }
                }
            }
        }

        debug!(set = M::SET_NAME, saved = saved.len(), "Committed changes");
        *state = staged;
        Ok(saved)
    }
}
