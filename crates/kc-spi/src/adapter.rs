//! Adapter capabilities and the shared entity cell.
//!
//! An adapter is the in-memory projection of one entity for one request.
//! Mutators change only the working copy; the store write happens when the
//! request commits and the session flushes every dirty adapter.

use async_trait::async_trait;
use kc_repository::CompositeRepository;
use kc_storage::{StorageError, StorageResult};
use parking_lot::Mutex;
use uuid::Uuid;

/// Lifecycle of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Matches the store.
    Loaded,
    /// Changed since it was loaded or last flushed.
    Dirty,
    /// Written to the store.
    Flushed,
    /// Dropped without writing; every further use fails.
    Discarded,
}

/// Identity of an adapter in the request registry.
pub trait Identifiable {
    /// Entity kind, e.g. `"user"`.
    fn kind(&self) -> &'static str;

    /// Entity ID.
    fn id(&self) -> Uuid;
}

/// Change tracking.
pub trait Dirtyable {
    /// Whether the adapter holds unwritten changes.
    fn is_dirty(&self) -> bool;

    /// Flags the adapter for writing.
    fn mark_dirty(&self);
}

/// Deferred write of an adapter.
#[async_trait]
pub trait Flushable: Identifiable + Dirtyable + Send + Sync {
    /// Writes pending changes. Returns whether anything was written.
    ///
    /// A clean or discarded adapter is left alone, so repeated calls are
    /// harmless.
    ///
    /// # Errors
    ///
    /// Store failures and duplicate keys from the write.
    async fn flush(&self, repo: &CompositeRepository) -> StorageResult<bool>;

    /// Drops the adapter without writing.
    fn discard(&self);
}

#[derive(Debug)]
struct Inner<E> {
    entity: E,
    persisted: Option<E>,
    state: AdapterState,
    version: u64,
}

/// Working copy of one entity plus its persisted copy.
///
/// The persisted copy is what the store holds; stores use it to drop stale
/// index rows when keys change.
#[derive(Debug)]
pub struct EntityCell<E> {
    kind: &'static str,
    inner: Mutex<Inner<E>>,
}

/// Snapshot handed to the store on flush.
#[derive(Debug, Clone)]
pub struct PendingWrite<E> {
    /// Last persisted copy, if any.
    pub previous: Option<E>,
    /// Copy to write.
    pub current: E,
    version: u64,
}

impl<E: Clone> EntityCell<E> {
    /// Wraps an entity read from, or just written to, the store.
    #[must_use]
    pub fn loaded(kind: &'static str, entity: E) -> Self {
        Self {
            kind,
            inner: Mutex::new(Inner {
                persisted: Some(entity.clone()),
                entity,
                state: AdapterState::Loaded,
                version: 0,
            }),
        }
    }

    /// Wraps an entity that was never written.
    #[must_use]
    pub const fn unsaved(kind: &'static str, entity: E) -> Self {
        Self {
            kind,
            inner: Mutex::new(Inner {
                entity,
                persisted: None,
                state: AdapterState::Dirty,
                version: 0,
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AdapterState {
        self.inner.lock().state
    }

    /// Whether the cell holds unwritten changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state() == AdapterState::Dirty
    }

    /// Whether the cell was discarded.
    #[must_use]
    pub fn is_discarded(&self) -> bool {
        self.state() == AdapterState::Discarded
    }

    /// Reads the working copy.
    pub fn read<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.inner.lock().entity)
    }

    /// Clones the working copy.
    #[must_use]
    pub fn snapshot(&self) -> E {
        self.inner.lock().entity.clone()
    }

    /// Clones the last persisted copy.
    #[must_use]
    pub fn persisted(&self) -> Option<E> {
        self.inner.lock().persisted.clone()
    }

    /// Mutates the working copy and marks the cell dirty.
    ///
    /// # Errors
    ///
    /// Invalid state when the cell was discarded.
    pub fn update<R>(&self, f: impl FnOnce(&mut E) -> R) -> StorageResult<R> {
        let mut inner = self.inner.lock();
        if inner.state == AdapterState::Discarded {
            return Err(StorageError::invalid_state(format!(
                "{} adapter was discarded",
                self.kind
            )));
        }
        let result = f(&mut inner.entity);
        inner.state = AdapterState::Dirty;
        inner.version += 1;
        Ok(result)
    }

    /// Mutates the working copy without changing the state.
    ///
    /// Used for derived fields, such as recomputed expirations, that must
    /// not on their own cause a write.
    pub fn update_silently<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        f(&mut self.inner.lock().entity)
    }

    /// Flags the cell dirty. No effect once discarded.
    pub fn mark_dirty(&self) {
        let mut inner = self.inner.lock();
        if inner.state != AdapterState::Discarded {
            inner.state = AdapterState::Dirty;
            inner.version += 1;
        }
    }

    /// Takes the pending write, or `None` when there is nothing to write.
    #[must_use]
    pub fn pending(&self) -> Option<PendingWrite<E>> {
        let inner = self.inner.lock();
        (inner.state == AdapterState::Dirty).then(|| PendingWrite {
            previous: inner.persisted.clone(),
            current: inner.entity.clone(),
            version: inner.version,
        })
    }

    /// Records a completed write.
    ///
    /// The cell stays dirty when it was mutated while the write was in
    /// flight.
    pub fn complete(&self, write: PendingWrite<E>) {
        let mut inner = self.inner.lock();
        if inner.state == AdapterState::Discarded {
            return;
        }
        inner.persisted = Some(write.current);
        if inner.version == write.version {
            inner.state = AdapterState::Flushed;
        }
    }

    /// Discards the cell.
    pub fn discard(&self) {
        self.inner.lock().state = AdapterState::Discarded;
    }

    /// Entity kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Fails when the cell was discarded.
    ///
    /// # Errors
    ///
    /// Invalid state when the cell was discarded.
    pub fn ensure_live(&self) -> StorageResult<()> {
        if self.is_discarded() {
            return Err(StorageError::invalid_state(format!(
                "{} adapter was discarded",
                self.kind
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_cell_is_clean() {
        let cell = EntityCell::loaded("user", 1_u32);
        assert_eq!(cell.state(), AdapterState::Loaded);
        assert!(cell.pending().is_none());
    }

    #[test]
    fn update_marks_dirty() {
        let cell = EntityCell::loaded("user", 1_u32);
        cell.update(|v| *v = 2).unwrap();

        let pending = cell.pending().unwrap();
        assert_eq!(pending.previous, Some(1));
        assert_eq!(pending.current, 2);
    }

    #[test]
    fn complete_flushes_once() {
        let cell = EntityCell::loaded("user", 1_u32);
        cell.update(|v| *v = 2).unwrap();
        let pending = cell.pending().unwrap();
        cell.complete(pending);

        assert_eq!(cell.state(), AdapterState::Flushed);
        assert_eq!(cell.persisted(), Some(2));
        assert!(cell.pending().is_none());
    }

    #[test]
    fn mutation_during_write_keeps_cell_dirty() {
        let cell = EntityCell::loaded("user", 1_u32);
        cell.update(|v| *v = 2).unwrap();
        let pending = cell.pending().unwrap();
        cell.update(|v| *v = 3).unwrap();
        cell.complete(pending);

        assert!(cell.is_dirty());
        assert_eq!(cell.pending().unwrap().previous, Some(2));
    }

    #[test]
    fn discarded_cell_rejects_mutation() {
        let cell = EntityCell::unsaved("user", 1_u32);
        cell.discard();

        let err = cell.update(|v| *v = 2).unwrap_err();
        assert!(err.is_invalid_state());
        assert!(cell.pending().is_none());
        assert!(cell.ensure_live().is_err());
    }

    #[test]
    fn silent_update_does_not_dirty() {
        let cell = EntityCell::loaded("user", 1_u32);
        cell.update_silently(|v| *v = 5);

        assert_eq!(cell.snapshot(), 5);
        assert_eq!(cell.state(), AdapterState::Loaded);
    }
}
