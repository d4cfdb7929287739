//! Read and write interception.
//!
//! The store call is passed as a future and only awaited on a miss, so a
//! hit never reaches the store. Failed calls are neither cached nor
//! invalidate anything.

use std::future::Future;

use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheKey, RequestCache};
use crate::tag::CacheTag;

impl RequestCache {
    /// Runs a read through the cache.
    pub async fn intercept_read<T, E, A, F>(&self, tag: CacheTag, args: &A, call: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        A: Serialize + Sync + ?Sized,
        F: Future<Output = Result<T, E>> + Send,
    {
        debug_assert!(tag.is_read(), "{} is not a read", tag.operation);
        let Some(key) = CacheKey::for_call(tag.operation, args) else {
            debug!(operation = tag.operation, "arguments not fingerprintable, bypassing cache");
            return call.await;
        };

        if let Some(value) = self.get::<T>(tag.cache, &key) {
            debug!(cache = tag.cache, operation = tag.operation, "cache hit");
            return Ok(value);
        }
        debug!(cache = tag.cache, operation = tag.operation, "cache miss");

        let value = call.await?;
        self.put(tag.cache, key, value.clone());
        Ok(value)
    }

    /// Runs a write and clears the tagged partition once it succeeds.
    pub async fn intercept_write<T, E, F>(&self, tag: CacheTag, call: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>> + Send,
    {
        debug_assert!(!tag.is_read(), "{} is not a write", tag.operation);
        let value = call.await?;
        debug!(cache = tag.cache, operation = tag.operation, "invalidating cache");
        self.invalidate(tag.cache);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::tag::caches;

    const READ: CacheTag = CacheTag::read(caches::USERS, "get_by_id");
    const WRITE: CacheTag = CacheTag::write(caches::USERS, "update");

    async fn counted(calls: &AtomicU32, value: u32) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn hit_skips_call() {
        let cache = RequestCache::new();
        let calls = AtomicU32::new(0);

        let first = cache.intercept_read(READ, &1, counted(&calls, 10)).await;
        let second = cache.intercept_read(READ, &1, counted(&calls, 20)).await;

        assert_eq!(first, Ok(10));
        assert_eq!(second, Ok(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn write_invalidates_partition() {
        let cache = RequestCache::new();
        let calls = AtomicU32::new(0);

        cache.intercept_read(READ, &1, counted(&calls, 10)).await.unwrap();
        cache
            .intercept_write(WRITE, async { Ok::<_, String>(()) })
            .await
            .unwrap();
        let after = cache.intercept_read(READ, &1, counted(&calls, 30)).await;

        assert_eq!(after, Ok(30));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached_and_do_not_invalidate() {
        let cache = RequestCache::new();
        let calls = AtomicU32::new(0);

        let failed: Result<u32, String> = cache
            .intercept_read(READ, &2, async { Err("store down".to_string()) })
            .await;
        assert!(failed.is_err());
        assert_eq!(cache.len(caches::USERS), 0);

        cache.intercept_read(READ, &1, counted(&calls, 10)).await.unwrap();
        let write: Result<(), String> = cache
            .intercept_write(WRITE, async { Err("store down".to_string()) })
            .await;
        assert!(write.is_err());
        assert_eq!(cache.len(caches::USERS), 1);
    }
}
