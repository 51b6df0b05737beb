//! Generic CRUD repository with pagination and pluggable model policies.
//!
//! The repository owns the workflow (normalize, validate, persist, page);
//! a [`ModelPolicy`] supplies everything that depends on the concrete
//! model: normalization, validation rules, how updates are copied onto the
//! stored record, which fields each query shape loads, and how a filter
//! narrows a query.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::model_context::ModelContext;
use crate::domain::{ChangeSet, Filter, FilterCondition, FilterValue, Model, ModelQuery, Page};
use crate::ports::{BoundQuery, Localizer, ModelStore, RepositoryError};

/// Localization key for "model does not exist" messages.
pub const DOES_NOT_EXIST_KEY: &str = "DoesNotExist";

/// Localization key for "duplicate field" messages.
pub const HAS_DUPLICATE_FIELD_KEY: &str = "HasDuplicateField";

/// Localization key for "invalid field" messages.
pub const HAS_INVALID_FIELD_KEY: &str = "HasInvalidField";

/// Helpers handed to [`ModelPolicy::validate_model`].
///
/// Gives validation rules read access to the store (for uniqueness checks)
/// and builds the localized validation messages.
pub struct ModelValidation<'a, M: Model> {
    store: &'a dyn ModelStore<M>,
    localizer: &'a dyn Localizer,
    model_name: &'a str,
}

impl<'a, M: Model> ModelValidation<'a, M> {
    pub fn new(
        store: &'a dyn ModelStore<M>,
        localizer: &'a dyn Localizer,
        model_name: &'a str,
    ) -> Self {
        Self {
            store,
            localizer,
            model_name,
        }
    }

    /// Whether any stored model matches `condition`.
    pub async fn any(&self, condition: FilterCondition) -> Result<bool, RepositoryError> {
        let query = ModelQuery::new().filter(condition);
        Ok(self.store.count(&query).await? > 0)
    }

    /// Whether another stored model already has `value` in `field`.
    ///
    /// The model itself is excluded, so updates don't collide with their
    /// own stored record.
    pub async fn is_duplicate(
        &self,
        model: &M,
        field: &str,
        value: impl Into<FilterValue> + Send,
    ) -> Result<bool, RepositoryError> {
        let query = ModelQuery::new()
            .filter(FilterCondition::eq(field, value))
            .filter(FilterCondition::ne("id", model.id()));
        Ok(self.store.count(&query).await? > 0)
    }

    /// Localized "does not exist" message for this model.
    pub fn does_not_exist_message(&self) -> String {
        does_not_exist_message(self.localizer, self.model_name)
    }

    /// Localized "duplicate field" message.
    pub fn duplicate_field_message(&self, field: &str) -> String {
        self.localizer.get_scoped_string(
            self.model_name,
            HAS_DUPLICATE_FIELD_KEY,
            &[self.model_name, field],
        )
    }

    /// Localized "invalid field" message.
    pub fn invalid_field_message(&self, field: &str) -> String {
        self.localizer.get_scoped_string(
            self.model_name,
            HAS_INVALID_FIELD_KEY,
            &[self.model_name, field],
        )
    }

    /// Validation error for a duplicate field.
    pub fn duplicate_field(&self, field: &str) -> RepositoryError {
        RepositoryError::invalid(self.duplicate_field_message(field))
    }

    /// Validation error for an invalid field.
    pub fn invalid_field(&self, field: &str) -> RepositoryError {
        RepositoryError::invalid(self.invalid_field_message(field))
    }
}

fn does_not_exist_message(localizer: &dyn Localizer, model_name: &str) -> String {
    localizer.get_scoped_string(model_name, DOES_NOT_EXIST_KEY, &[model_name])
}

/// Model-specific behavior plugged into a [`ModelRepository`].
///
/// Only `model_name`, `update_model` and `filter_query` are required; the
/// remaining hooks default to "do nothing" or "load the full document".
#[async_trait]
pub trait ModelPolicy<M: Model, F: Filter>: Send + Sync {
    /// Name used in messages and as the localization scope.
    fn model_name(&self) -> &str;

    /// Canonicalize the incoming model (e.g. fill normalized lookup fields).
    fn normalize_model(&self, _model: &mut M) {}

    /// Reject invalid input with [`RepositoryError::Invalid`].
    async fn validate_model(
        &self,
        _model: &M,
        _validation: &ModelValidation<'_, M>,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }

    /// Copy the updatable scalar fields from `source` onto `target`.
    fn update_model(&self, source: &M, target: &mut M);

    /// Copy relations from `source` onto `target`.
    fn update_model_relations(&self, _source: &M, _target: &mut M) {}

    /// Query shape used for counting. Never materializes documents.
    fn count_query(&self) -> ModelQuery {
        ModelQuery::new()
    }

    /// Query shape used for listings; excludes detail-only relations.
    fn simple_query(&self) -> ModelQuery {
        ModelQuery::new()
    }

    /// Query shape used for single-model reads; loads everything.
    fn detailed_query(&self) -> ModelQuery {
        ModelQuery::new()
    }

    /// Apply the filter's criteria and ordering to a query.
    ///
    /// Paging is applied by the repository, not here.
    fn filter_query(&self, query: ModelQuery, filter: &F) -> ModelQuery;
}

/// Generic repository over one model set.
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(MemoryModelStore::<Note>::new());
/// let repo = ModelRepository::new(ModelContext::new(store), NotePolicy, Arc::new(NoopLocalizer));
///
/// let note = repo.create(Note::new(1, "Groceries")).await?;
/// let page = repo.get_all(Some(NoteFilter::default())).await?;
/// ```
pub struct ModelRepository<M: Model, F: Filter, P: ModelPolicy<M, F>> {
    context: ModelContext<M>,
    policy: P,
    localizer: Arc<dyn Localizer>,
    _filter: PhantomData<fn() -> F>,
}

impl<M, F, P> ModelRepository<M, F, P>
where
    M: Model,
    F: Filter,
    P: ModelPolicy<M, F>,
{
    /// Create a repository from its context, policy and localizer.
    pub fn new(context: ModelContext<M>, policy: P, localizer: Arc<dyn Localizer>) -> Self {
        Self {
            context,
            policy,
            localizer,
            _filter: PhantomData,
        }
    }

    pub const fn context(&self) -> &ModelContext<M> {
        &self.context
    }

    pub const fn policy(&self) -> &P {
        &self.policy
    }

    fn store(&self) -> &dyn ModelStore<M> {
        self.context.store()
    }

    fn validation(&self) -> ModelValidation<'_, M> {
        ModelValidation::new(self.store(), self.localizer.as_ref(), self.policy.model_name())
    }

    fn not_found(&self, id: i64) -> RepositoryError {
        let model_name = self.policy.model_name();
        warn!(model = model_name, id, "Model does not exist");
        RepositoryError::NotFound(does_not_exist_message(self.localizer.as_ref(), model_name))
    }

    async fn prepare(&self, model: &mut M) -> Result<(), RepositoryError> {
        self.policy.normalize_model(model);
        self.policy.validate_model(model, &self.validation()).await
    }

    async fn find(&self, query: ModelQuery, id: i64) -> Result<M, RepositoryError> {
        let query = query.with_id(id).take(1);
        self.store()
            .fetch(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(id))
    }

    /// Normalize, validate and insert a new model.
    ///
    /// Returns the stored model with its assigned id and creation time.
    pub async fn create(&self, mut model: M) -> Result<M, RepositoryError> {
        debug!(model = self.policy.model_name(), "Creating model");
        self.prepare(&mut model).await?;

        let mut changes = ChangeSet::new();
        changes.add(model);
        self.saved_model(self.context.save_changes(&mut changes).await?)
    }

    /// Apply the incoming model onto the stored one.
    ///
    /// Scalar fields and relations are copied by the policy and persisted
    /// together in a single save. Returns the stored model after the update.
    pub async fn update(&self, mut model: M) -> Result<M, RepositoryError> {
        let id = model.id();
        debug!(model = self.policy.model_name(), id, "Updating model");

        let mut existing = self.find(ModelQuery::new(), id).await?;
        self.prepare(&mut model).await?;

        self.policy.update_model(&model, &mut existing);
        self.policy.update_model_relations(&model, &mut existing);
        existing.audit_mut().updated_by = model.audit().updated_by;

        let mut changes = ChangeSet::new();
        changes.update(existing);
        self.saved_model(self.context.save_changes(&mut changes).await?)
    }

    /// Delete the model with the given id.
    pub async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        debug!(model = self.policy.model_name(), id, "Deleting model");
        if !self.store().exists(id).await? {
            return Err(self.not_found(id));
        }

        let mut changes = ChangeSet::new();
        changes.remove(id);
        self.context.save_changes(&mut changes).await?;
        Ok(())
    }

    /// Load one model with every relation.
    pub async fn get(&self, id: i64) -> Result<M, RepositoryError> {
        debug!(model = self.policy.model_name(), id, "Getting model");
        self.find(self.policy.detailed_query(), id).await
    }

    /// Load one page of models.
    ///
    /// Uses the default filter when none is given. The item query is the
    /// simple shape, the total comes from the count shape; both pass
    /// through the policy's filter.
    pub async fn get_all(&self, filter: Option<F>) -> Result<Page<M>, RepositoryError> {
        let filter = filter.unwrap_or_default();
        let base = filter.base();
        debug!(
            model = self.policy.model_name(),
            page_number = base.page_number(),
            page_size = base.page_size(),
            "Getting models"
        );

        let items = self.policy.filter_query(self.policy.simple_query(), &filter);
        let count = self.policy.filter_query(self.policy.count_query(), &filter);

        let items = BoundQuery::new(self.store(), items);
        let count = BoundQuery::new(self.store(), count);

        let page = Page::create_async(
            &items,
            &count,
            base.page_number(),
            base.page_size(),
            base.order_by().to_string(),
            base.order_direction().to_string(),
        )
        .await?;
        Ok(page)
    }

    /// Whether a model with the given id exists.
    pub async fn exists(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.store().exists(id).await?)
    }

    fn saved_model(&self, saved: Vec<M>) -> Result<M, RepositoryError> {
        saved.into_iter().next().ok_or_else(|| {
            RepositoryError::Storage(anyhow::anyhow!(
                "store returned no model for saved {}",
                self.policy.model_name()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::domain::{Audit, Change, FilterOperator, ModelFilter, OrderDirection};
    use crate::ports::NoopLocalizer;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Tag {
        #[serde(flatten)]
        audit: Audit,
        label: String,
    }

    impl Model for Tag {
        const SET_NAME: &'static str = "tags";

        fn audit(&self) -> &Audit {
            &self.audit
        }

        fn audit_mut(&mut self) -> &mut Audit {
            &mut self.audit
        }
    }

    fn tag(label: &str) -> Tag {
        Tag {
            audit: Audit::created_by(1),
            label: label.to_string(),
        }
    }

    /// Store keeping tags in a map; conditions are only understood on `id`.
    #[derive(Default)]
    struct MapStore {
        tags: Mutex<BTreeMap<i64, Tag>>,
        commits: Mutex<Vec<Vec<Change<Tag>>>>,
    }

    impl MapStore {
        fn id_condition(query: &ModelQuery) -> Option<i64> {
            query.conditions().iter().find_map(|c| match (&c.field[..], &c.value) {
                ("id", FilterValue::Integer(id)) if c.operator == FilterOperator::Equal => Some(*id),
                _ => None,
            })
        }
    }

    #[async_trait]
    impl ModelStore<Tag> for MapStore {
        async fn fetch(&self, query: &ModelQuery) -> anyhow::Result<Vec<Tag>> {
            let tags = self.tags.lock().unwrap();
            let matching: Vec<Tag> = match Self::id_condition(query) {
                Some(id) => tags.get(&id).cloned().into_iter().collect(),
                None => tags.values().cloned().collect(),
            };
            let offset = usize::try_from(query.offset()).unwrap();
            let limit = query.limit().map_or(usize::MAX, |l| usize::try_from(l).unwrap());
            Ok(matching.into_iter().skip(offset).take(limit).collect())
        }

        async fn count(&self, query: &ModelQuery) -> anyhow::Result<u64> {
            Ok(self.fetch(&query.clone().unpaged()).await?.len() as u64)
        }

        async fn exists(&self, id: i64) -> anyhow::Result<bool> {
            Ok(self.tags.lock().unwrap().contains_key(&id))
        }

        #[allow(clippy::significant_drop_tightening)]
        async fn commit(&self, changes: Vec<Change<Tag>>) -> anyhow::Result<Vec<Tag>> {
            self.commits.lock().unwrap().push(changes.clone());
            let mut tags = self.tags.lock().unwrap();
            let mut saved = Vec::new();
            for change in changes {
                match change {
                    Change::Insert(mut tag) => {
                        tag.audit.id = tags.keys().next_back().map_or(1, |id| id + 1);
                        tags.insert(tag.audit.id, tag.clone());
                        saved.push(tag);
                    }
                    Change::Update(tag) => {
                        tags.insert(tag.audit.id, tag.clone());
                        saved.push(tag);
                    }
                    Change::Delete(id) => {
                        tags.remove(&id);
                    }
                }
            }
            Ok(saved)
        }
    }

    type TagFilter = ModelFilter<TagOrderBy>;

    #[derive(Debug, Clone, Copy, Default, strum_macros::Display, strum_macros::EnumString)]
    enum TagOrderBy {
        #[default]
        Id,
    }

    struct TagPolicy;

    #[async_trait]
    impl ModelPolicy<Tag, TagFilter> for TagPolicy {
        fn model_name(&self) -> &str {
            "Tag"
        }

        fn normalize_model(&self, model: &mut Tag) {
            model.label = model.label.trim().to_lowercase();
        }

        async fn validate_model(
            &self,
            model: &Tag,
            validation: &ModelValidation<'_, Tag>,
        ) -> Result<(), RepositoryError> {
            if model.label.is_empty() {
                return Err(validation.invalid_field("Label"));
            }
            Ok(())
        }

        fn update_model(&self, source: &Tag, target: &mut Tag) {
            target.label.clone_from(&source.label);
        }

        fn filter_query(&self, query: ModelQuery, filter: &TagFilter) -> ModelQuery {
            query.order_by("id", filter.order_direction())
        }
    }

    fn repository() -> (Arc<MapStore>, ModelRepository<Tag, TagFilter, TagPolicy>) {
        let store = Arc::new(MapStore::default());
        let repo = ModelRepository::new(
            ModelContext::new(store.clone()),
            TagPolicy,
            Arc::new(NoopLocalizer),
        );
        (store, repo)
    }

    #[tokio::test]
    async fn test_create_normalizes_and_assigns_id() {
        let (_, repo) = repository();

        let created = repo.create(tag("  Rust ")).await.unwrap();
        assert_eq!(created.audit.id, 1);
        assert_eq!(created.label, "rust");
        assert!(repo.exists(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_model() {
        let (store, repo) = repository();

        let err = repo.create(tag("   ")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Invalid(_)));
        assert_eq!(err.messages(), ["Tag.HasInvalidField"]);
        assert!(store.commits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_is_one_commit() {
        let (store, repo) = repository();
        let created = repo.create(tag("old")).await.unwrap();

        let mut incoming = created.clone();
        incoming.label = "New".to_string();
        incoming.audit.updated_by = Some(2);
        incoming.audit.created_by = 99;

        let updated = repo.update(incoming).await.unwrap();
        assert_eq!(updated.label, "new");
        assert_eq!(updated.audit.updated_by, Some(2));
        assert_eq!(updated.audit.created_by, 1);
        assert!(updated.audit.updated_at.is_some());

        let commits = store.commits.lock().unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].len(), 1);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let (store, repo) = repository();
        let mut ghost = tag("ghost");
        ghost.audit.id = 42;

        for err in [
            repo.update(ghost).await.unwrap_err(),
            repo.delete(42).await.unwrap_err(),
            repo.get(42).await.unwrap_err(),
        ] {
            assert!(matches!(err, RepositoryError::NotFound(_)));
            assert_eq!(err.status_code(), 404);
            assert_eq!(err.messages(), ["Tag.DoesNotExist"]);
        }
        assert!(store.commits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_model() {
        let (_, repo) = repository();
        let created = repo.create(tag("temp")).await.unwrap();

        repo.delete(created.audit.id).await.unwrap();
        assert!(!repo.exists(created.audit.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_all_with_default_filter() {
        let (_, repo) = repository();
        for i in 0..12 {
            repo.create(tag(&format!("tag-{i}"))).await.unwrap();
        }

        let page = repo.get_all(None).await.unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page.page_number(), 1);
        assert_eq!(page.total_items(), 12);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.order_by(), "Id");
        assert_eq!(page.order_direction(), "Ascending");

        let second = repo
            .get_all(Some(
                TagFilter::new()
                    .with_page(2, 10)
                    .with_order(TagOrderBy::Id, OrderDirection::Ascending),
            ))
            .await
            .unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_storage_errors_pass_through() {
        struct FailingStore;

        #[async_trait]
        impl ModelStore<Tag> for FailingStore {
            async fn fetch(&self, _query: &ModelQuery) -> anyhow::Result<Vec<Tag>> {
                Err(std::io::Error::other("offline").into())
            }

            async fn count(&self, _query: &ModelQuery) -> anyhow::Result<u64> {
                Err(std::io::Error::other("offline").into())
            }

            async fn exists(&self, _id: i64) -> anyhow::Result<bool> {
                Err(std::io::Error::other("offline").into())
            }

            async fn commit(&self, _changes: Vec<Change<Tag>>) -> anyhow::Result<Vec<Tag>> {
                Err(std::io::Error::other("offline").into())
            }
        }

        let repo: ModelRepository<Tag, TagFilter, TagPolicy> = ModelRepository::new(
            ModelContext::new(Arc::new(FailingStore)),
            TagPolicy,
            Arc::new(NoopLocalizer),
        );

        let err = repo.get(1).await.unwrap_err();
        let RepositoryError::Storage(inner) = err else {
            panic!("expected storage error");
        };
        assert!(inner.downcast_ref::<std::io::Error>().is_some());
    }
}
