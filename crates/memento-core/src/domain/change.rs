//! Pending writes tracked until the next save.

use super::model::Model;

/// One write to apply to a model set.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<M> {
    /// Insert a new model; the store assigns its id.
    Insert(M),
    /// Replace the stored document with the same id.
    Update(M),
    /// Remove the model with this id.
    Delete(i64),
}

impl<M: Model> Change<M> {
    /// Id targeted by the change (`0` for inserts).
    pub fn id(&self) -> i64 {
        match self {
            Self::Insert(model) | Self::Update(model) => model.id(),
            Self::Delete(id) => *id,
        }
    }

    pub const fn state(&self) -> EntryState {
        match self {
            Self::Insert(_) => EntryState::Added,
            Self::Update(_) => EntryState::Modified,
            Self::Delete(_) => EntryState::Deleted,
        }
    }
}

/// State of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
}

/// A tracked change plus whether its timestamps were already stamped.
#[derive(Debug, Clone)]
pub struct ChangeEntry<M> {
    pub(crate) change: Change<M>,
    pub(crate) stamped: bool,
}

impl<M: Model> ChangeEntry<M> {
    pub const fn change(&self) -> &Change<M> {
        &self.change
    }

    pub const fn state(&self) -> EntryState {
        self.change.state()
    }

    /// Whether the context already stamped this entry's timestamps.
    pub const fn is_stamped(&self) -> bool {
        self.stamped
    }
}

/// Ordered set of pending writes, applied together by one save.
///
/// ```rust
/// # use memento_core::{Audit, Model};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Debug, Clone, Serialize, Deserialize)]
/// # struct Note { #[serde(flatten)] audit: Audit }
/// # impl Model for Note {
/// #     const SET_NAME: &'static str = "notes";
/// #     fn audit(&self) -> &Audit { &self.audit }
/// #     fn audit_mut(&mut self) -> &mut Audit { &mut self.audit }
/// # }
/// use memento_core::{ChangeSet, EntryState};
///
/// let mut changes = ChangeSet::new();
/// changes.add(Note { audit: Audit::created_by(1) });
/// changes.remove(42);
///
/// let states: Vec<_> = changes.entries().iter().map(|e| e.state()).collect();
/// assert_eq!(states, [EntryState::Added, EntryState::Deleted]);
/// ```
#[derive(Debug, Clone)]
pub struct ChangeSet<M> {
    entries: Vec<ChangeEntry<M>>,
}

impl<M> Default for ChangeSet<M> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<M: Model> ChangeSet<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new model for insertion.
    pub fn add(&mut self, model: M) {
        self.push(Change::Insert(model));
    }

    /// Track a modified model.
    pub fn update(&mut self, model: M) {
        self.push(Change::Update(model));
    }

    /// Track the removal of a model.
    pub fn remove(&mut self, id: i64) {
        self.push(Change::Delete(id));
    }

    fn push(&mut self, change: Change<M>) {
        self.entries.push(ChangeEntry {
            change,
            stamped: false,
        });
    }

    pub fn entries(&self) -> &[ChangeEntry<M>] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [ChangeEntry<M>] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stop tracking every entry.
    pub fn accept_all_changes(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of the pending changes in tracking order.
    pub fn to_changes(&self) -> Vec<Change<M>> {
        self.entries.iter().map(|e| e.change.clone()).collect()
    }
}
