//! Request-local (L1) cache.
//!
//! One instance per request. Values are stored per named partition and keyed
//! by operation identity plus a fingerprint of the call arguments. Nothing
//! expires; the whole cache is dropped or cleared when the request ends.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

type Partition = HashMap<CacheKey, Arc<dyn Any + Send + Sync>>;

/// Key of one cached call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: &'static str,
    fingerprint: String,
}

impl CacheKey {
    /// Creates a key from an operation and its argument fingerprint.
    #[must_use]
    pub fn new(operation: &'static str, fingerprint: impl Into<String>) -> Self {
        Self {
            operation,
            fingerprint: fingerprint.into(),
        }
    }

    /// Fingerprints the arguments of a call.
    ///
    /// Returns `None` when the arguments cannot be serialized; such calls
    /// bypass the cache.
    pub fn for_call<A: Serialize + ?Sized>(operation: &'static str, args: &A) -> Option<Self> {
        serde_json::to_string(args)
            .ok()
            .map(|fingerprint| Self::new(operation, fingerprint))
    }

    /// Operation identity.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed.
    pub misses: u64,
    /// Partition invalidations.
    pub invalidations: u64,
}

/// Cache scoped to one request.
#[derive(Default)]
pub struct RequestCache {
    partitions: Mutex<HashMap<&'static str, Partition>>,
    stats: Mutex<CacheStats>,
}

impl std::fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCache")
            .field("partitions", &self.partitions.lock().len())
            .field("stats", &*self.stats.lock())
            .finish()
    }
}

impl RequestCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a value. A value of another type counts as a miss.
    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self, cache: &str, key: &CacheKey) -> Option<T> {
        let value = self
            .partitions
            .lock()
            .get(cache)
            .and_then(|partition| partition.get(key))
            .and_then(|value| value.downcast_ref::<T>().cloned());

        let mut stats = self.stats.lock();
        if value.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        value
    }

    /// Stores a value.
    pub fn put<T: Send + Sync + 'static>(&self, cache: &'static str, key: CacheKey, value: T) {
        self.partitions
            .lock()
            .entry(cache)
            .or_default()
            .insert(key, Arc::new(value));
    }

    /// Drops every value of a partition.
    pub fn invalidate(&self, cache: &str) {
        self.partitions.lock().remove(cache);
        self.stats.lock().invalidations += 1;
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.partitions.lock().clear();
    }

    /// Number of values held in a partition.
    #[must_use]
    pub fn len(&self, cache: &str) -> usize {
        self.partitions.lock().get(cache).map_or(0, HashMap::len)
    }

    /// Checks whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitions.lock().values().all(HashMap::is_empty)
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_put_invalidate() {
        let cache = RequestCache::new();
        let key = CacheKey::new("op", "[1]");

        assert_eq!(cache.get::<u32>("users", &key), None);
        cache.put("users", key.clone(), 7_u32);
        assert_eq!(cache.get::<u32>("users", &key), Some(7));

        cache.invalidate("users");
        assert_eq!(cache.get::<u32>("users", &key), None);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                invalidations: 1
            }
        );
    }

    #[test]
    fn invalidation_is_per_partition() {
        let cache = RequestCache::new();
        let key = CacheKey::new("op", "x");
        cache.put("users", key.clone(), 1_u8);
        cache.put("roles", key.clone(), 2_u8);

        cache.invalidate("users");

        assert_eq!(cache.len("users"), 0);
        assert_eq!(cache.get::<u8>("roles", &key), Some(2));
    }

    #[test]
    fn type_mismatch_is_a_miss() {
        let cache = RequestCache::new();
        let key = CacheKey::new("op", "x");
        cache.put("users", key.clone(), String::from("v"));

        assert_eq!(cache.get::<u32>("users", &key), None);
    }

    #[test]
    fn fingerprint_distinguishes_arguments() {
        let a = CacheKey::for_call("get", &("realm", 1)).unwrap();
        let b = CacheKey::for_call("get", &("realm", 2)).unwrap();
        let c = CacheKey::for_call("find", &("realm", 1)).unwrap();

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, CacheKey::for_call("get", &("realm", 1)).unwrap());
    }
}
