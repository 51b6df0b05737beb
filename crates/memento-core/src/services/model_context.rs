//! Unit of work that stamps audit timestamps before persisting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{Change, ChangeSet, Model};
use crate::ports::{ModelStore, RepositoryError};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock (`Utc::now`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Persistence context for one model set.
///
/// Before delegating a save to the store, the context walks the pending
/// entries once:
///
/// - added entries get `created_at = now` and no `updated_at`
/// - modified entries get `updated_at = now`, never earlier than before
/// - entries stamped by an earlier (failed) save keep their timestamps
pub struct ModelContext<M: Model> {
    store: Arc<dyn ModelStore<M>>,
    clock: Arc<dyn Clock>,
}

impl<M: Model> Clone for ModelContext<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<M: Model> ModelContext<M> {
    /// Create a context over `store` using the system clock.
    pub fn new(store: Arc<dyn ModelStore<M>>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a context with an explicit clock.
    pub fn with_clock(store: Arc<dyn ModelStore<M>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The store this context persists to.
    pub fn store(&self) -> &dyn ModelStore<M> {
        self.store.as_ref()
    }

    /// Save every pending change and stop tracking them on success.
    pub async fn save_changes(
        &self,
        changes: &mut ChangeSet<M>,
    ) -> Result<Vec<M>, RepositoryError> {
        self.save_changes_with(changes, true).await
    }

    /// Save every pending change.
    ///
    /// On success, the change set is cleared only when
    /// `accept_all_changes_on_success` is set. On failure it is left as is,
    /// already stamped, so the save can be retried.
    ///
    /// Returns the inserted and updated models as stored.
    pub async fn save_changes_with(
        &self,
        changes: &mut ChangeSet<M>,
        accept_all_changes_on_success: bool,
    ) -> Result<Vec<M>, RepositoryError> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        self.stamp(changes);

        debug!(set = M::SET_NAME, changes = changes.len(), "Saving changes");
        let saved = self.store.commit(changes.to_changes()).await?;

        if accept_all_changes_on_success {
            changes.accept_all_changes();
        }
        Ok(saved)
    }

    fn stamp(&self, changes: &mut ChangeSet<M>) {
        let now = self.clock.now();

        for entry in changes.entries_mut() {
            if entry.stamped {
                continue;
            }

            match &mut entry.change {
                Change::Insert(model) => {
                    let audit = model.audit_mut();
                    audit.created_at = now;
                    audit.updated_at = None;
                }
                Change::Update(model) => {
                    let audit = model.audit_mut();
                    let previous = audit.updated_at.unwrap_or(now);
                    audit.updated_at = Some(previous.max(now));
                }
                Change::Delete(_) => {}
            }
            entry.stamped = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use mockall::mock;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::domain::{Audit, ModelQuery};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(flatten)]
        audit: Audit,
        title: String,
    }

    impl Model for Note {
        const SET_NAME: &'static str = "notes";

        fn audit(&self) -> &Audit {
            &self.audit
        }

        fn audit_mut(&mut self) -> &mut Audit {
            &mut self.audit
        }
    }

    mock! {
        Store {}

        #[async_trait]
        impl ModelStore<Note> for Store {
            async fn fetch(&self, query: &ModelQuery) -> anyhow::Result<Vec<Note>>;
            async fn count(&self, query: &ModelQuery) -> anyhow::Result<u64>;
            async fn exists(&self, id: i64) -> anyhow::Result<bool>;
            async fn commit(&self, changes: Vec<Change<Note>>) -> anyhow::Result<Vec<Note>>;
        }
    }

    /// Clock that advances one second per reading.
    struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
    }

    impl SteppingClock {
        fn starting_at(start: DateTime<Utc>) -> Self {
            Self {
                next: Mutex::new(start),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap();
            let now = *next;
            *next = now + Duration::seconds(1);
            now
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn note(id: i64, title: &str) -> Note {
        Note {
            audit: Audit {
                id,
                ..Audit::default()
            },
            title: title.to_string(),
        }
    }

    fn echo_commit(changes: Vec<Change<Note>>) -> anyhow::Result<Vec<Note>> {
        Ok(changes
            .into_iter()
            .filter_map(|change| match change {
                Change::Insert(model) | Change::Update(model) => Some(model),
                Change::Delete(_) => None,
            })
            .collect())
    }

    fn context(store: MockStore) -> ModelContext<Note> {
        ModelContext::with_clock(Arc::new(store), Arc::new(SteppingClock::starting_at(t0())))
    }

    #[tokio::test]
    async fn test_added_entries_get_created_at() {
        let mut store = MockStore::new();
        store.expect_commit().times(1).returning(echo_commit);
        let ctx = context(store);

        let mut draft = note(0, "draft");
        draft.audit.updated_at = Some(t0() - Duration::days(3));

        let mut changes = ChangeSet::new();
        changes.add(draft);
        let saved = ctx.save_changes(&mut changes).await.unwrap();

        assert_eq!(saved[0].audit.created_at, t0());
        assert_eq!(saved[0].audit.updated_at, None);
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn test_modified_entries_get_updated_at() {
        let mut store = MockStore::new();
        store.expect_commit().times(1).returning(echo_commit);
        let ctx = context(store);

        let mut edited = note(4, "edited");
        edited.audit.created_at = t0() - Duration::days(1);

        let mut changes = ChangeSet::new();
        changes.update(edited);
        let saved = ctx.save_changes(&mut changes).await.unwrap();

        assert_eq!(saved[0].audit.updated_at, Some(t0()));
        assert_eq!(saved[0].audit.created_at, t0() - Duration::days(1));
    }

    #[tokio::test]
    async fn test_updated_at_never_moves_backwards() {
        let mut store = MockStore::new();
        store.expect_commit().times(1).returning(echo_commit);
        let ctx = context(store);

        let future = t0() + Duration::hours(2);
        let mut edited = note(4, "edited");
        edited.audit.updated_at = Some(future);

        let mut changes = ChangeSet::new();
        changes.update(edited);
        let saved = ctx.save_changes(&mut changes).await.unwrap();

        assert_eq!(saved[0].audit.updated_at, Some(future));
    }

    #[tokio::test]
    async fn test_one_timestamp_per_save() {
        let mut store = MockStore::new();
        store.expect_commit().times(1).returning(echo_commit);
        let ctx = context(store);

        let mut changes = ChangeSet::new();
        changes.add(note(0, "a"));
        changes.add(note(0, "b"));
        changes.update(note(9, "c"));
        let saved = ctx.save_changes(&mut changes).await.unwrap();

        assert_eq!(saved[0].audit.created_at, t0());
        assert_eq!(saved[1].audit.created_at, t0());
        assert_eq!(saved[2].audit.updated_at, Some(t0()));
    }

    #[tokio::test]
    async fn test_failed_save_is_not_restamped_on_retry() {
        let mut store = MockStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_commit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("database is locked")));
        store
            .expect_commit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(echo_commit);
        let ctx = context(store);

        let mut changes = ChangeSet::new();
        changes.add(note(0, "retry"));

        let err = ctx.save_changes(&mut changes).await.unwrap_err();
        assert_eq!(err.to_string(), "database is locked");
        assert_eq!(changes.len(), 1);
        assert!(changes.entries()[0].is_stamped());

        // Second attempt reads the clock again but keeps the first stamp.
        let saved = ctx.save_changes(&mut changes).await.unwrap();
        assert_eq!(saved[0].audit.created_at, t0());
    }

    #[tokio::test]
    async fn test_entries_added_after_failure_are_stamped() {
        let mut store = MockStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_commit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("busy")));
        store
            .expect_commit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(echo_commit);
        let ctx = context(store);

        let mut changes = ChangeSet::new();
        changes.add(note(0, "first"));
        assert!(ctx.save_changes(&mut changes).await.is_err());

        changes.add(note(0, "second"));
        let saved = ctx.save_changes(&mut changes).await.unwrap();

        assert_eq!(saved[0].audit.created_at, t0());
        assert_eq!(saved[1].audit.created_at, t0() + Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_changes_kept_when_not_accepting() {
        let mut store = MockStore::new();
        store.expect_commit().times(1).returning(echo_commit);
        let ctx = context(store);

        let mut changes = ChangeSet::new();
        changes.remove(3);
        ctx.save_changes_with(&mut changes, false).await.unwrap();

        assert_eq!(changes.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_change_set_skips_store() {
        let mut store = MockStore::new();
        store.expect_commit().never();
        let ctx = context(store);

        let saved = ctx.save_changes(&mut ChangeSet::new()).await.unwrap();
        assert!(saved.is_empty());
    }

    #[tokio::test]
    async fn test_deletes_are_passed_through() {
        let mut store = MockStore::new();
        store
            .expect_commit()
            .withf(|changes| changes == &[Change::Delete(8)])
            .times(1)
            .returning(echo_commit);
        let ctx = context(store);

        let mut changes = ChangeSet::new();
        changes.remove(8);
        assert!(ctx.save_changes(&mut changes).await.unwrap().is_empty());
    }
}
