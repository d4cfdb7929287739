//! Per-request adapter registry.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::adapter::Flushable;

/// Entity kinds used as registry keys.
pub mod kinds {
    /// Realm adapters.
    pub const REALM: &str = "realm";
    /// User adapters.
    pub const USER: &str = "user";
    /// Client adapters.
    pub const CLIENT: &str = "client";
    /// Role adapters.
    pub const ROLE: &str = "role";
    /// User session adapters, online and offline.
    pub const USER_SESSION: &str = "user-session";
    /// Root authentication session adapters.
    pub const ROOT_AUTH_SESSION: &str = "root-auth-session";
    /// Login failure adapters, keyed by user ID.
    pub const LOGIN_FAILURE: &str = "login-failure";
}

/// Registry key: entity kind plus entity ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterKey {
    /// Entity kind.
    pub kind: &'static str,
    /// Entity ID.
    pub id: Uuid,
}

impl AdapterKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(kind: &'static str, id: Uuid) -> Self {
        Self { kind, id }
    }
}

struct Entry {
    typed: Arc<dyn Any + Send + Sync>,
    flushable: Arc<dyn Flushable>,
}

#[derive(Default)]
struct Entries {
    by_key: HashMap<AdapterKey, Entry>,
    order: Vec<AdapterKey>,
}

/// Adapters live in the current request.
///
/// Holds at most one adapter per key, so every lookup of an entity within
/// a request returns the same instance. Adapters flush in registration
/// order.
#[derive(Default)]
pub struct AdapterRegistry {
    entries: Mutex<Entries>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.len())
            .finish()
    }
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the adapter registered under a key.
    ///
    /// Returns `None` when nothing is registered or the adapter has another
    /// type.
    #[must_use]
    pub fn get<A>(&self, kind: &'static str, id: Uuid) -> Option<Arc<A>>
    where
        A: Any + Send + Sync,
    {
        let entries = self.entries.lock();
        entries
            .by_key
            .get(&AdapterKey::new(kind, id))
            .and_then(|entry| Arc::clone(&entry.typed).downcast::<A>().ok())
    }

    /// Registers an adapter.
    ///
    /// When an adapter of the same type is already registered under the key
    /// it is returned instead and `adapter` is dropped.
    pub fn register<A>(&self, adapter: Arc<A>) -> Arc<A>
    where
        A: Flushable + Any + 'static,
    {
        let key = AdapterKey::new(adapter.kind(), adapter.id());
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.by_key.get(&key)
            && let Ok(existing) = Arc::clone(&existing.typed).downcast::<A>()
        {
            return existing;
        }

        let entry = Entry {
            typed: Arc::clone(&adapter) as Arc<dyn Any + Send + Sync>,
            flushable: Arc::clone(&adapter) as Arc<dyn Flushable>,
        };
        if entries.by_key.insert(key, entry).is_none() {
            entries.order.push(key);
        }
        adapter
    }

    /// Removes an adapter and discards it.
    ///
    /// Returns whether one was registered.
    pub fn remove(&self, kind: &'static str, id: Uuid) -> bool {
        let key = AdapterKey::new(kind, id);
        let removed = {
            let mut entries = self.entries.lock();
            entries.order.retain(|k| *k != key);
            entries.by_key.remove(&key)
        };
        match removed {
            Some(entry) => {
                entry.flushable.discard();
                true
            }
            None => false,
        }
    }

    /// Every adapter in registration order.
    #[must_use]
    pub fn adapters(&self) -> Vec<Arc<dyn Flushable>> {
        let entries = self.entries.lock();
        entries
            .order
            .iter()
            .filter_map(|key| entries.by_key.get(key))
            .map(|entry| Arc::clone(&entry.flushable))
            .collect()
    }

    /// Number of adapters with unwritten changes.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.entries
            .lock()
            .by_key
            .values()
            .filter(|entry| entry.flushable.is_dirty())
            .count()
    }

    /// Empties the registry, returning the adapters in registration order.
    pub fn drain(&self) -> Vec<Arc<dyn Flushable>> {
        let mut entries = self.entries.lock();
        let order = std::mem::take(&mut entries.order);
        let mut by_key = std::mem::take(&mut entries.by_key);
        order
            .into_iter()
            .filter_map(|key| by_key.remove(&key))
            .map(|entry| entry.flushable)
            .collect()
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().by_key.len()
    }

    /// Whether no adapter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
