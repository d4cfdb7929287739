//! # kc-repository
//!
//! Composite repository: one façade over every entity store.
//!
//! Each method delegates to exactly one store call and is wrapped by the
//! request-local cache through its [`CacheTag`](kc_cache::CacheTag). Reads
//! are served from the cache when the same call was already made in this
//! request; writes clear the partition of their entity type. No business
//! rules live here and store errors pass through unchanged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth_session;
mod client;
mod event;
mod login_failure;
mod realm;
mod role;
mod session;
mod single_use;
mod tags;
mod user;

use std::sync::Arc;

use kc_cache::RequestCache;
use kc_storage::EntityStores;
use tracing::debug;

/// Request-scoped façade over the entity stores.
#[derive(Debug)]
pub struct CompositeRepository {
    stores: EntityStores,
    cache: Arc<RequestCache>,
}

impl CompositeRepository {
    /// Creates a repository for one request.
    #[must_use]
    pub const fn new(stores: EntityStores, cache: Arc<RequestCache>) -> Self {
        Self { stores, cache }
    }

    /// The request-local cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<RequestCache> {
        &self.cache
    }

    /// Ends the request: drops every cached value. Never fails.
    pub fn close(&self) {
        let stats = self.cache.stats();
        debug!(
            hits = stats.hits,
            misses = stats.misses,
            invalidations = stats.invalidations,
            "closing repository"
        );
        self.cache.clear();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use kc_cache::RequestCache;
    use kc_core::Clock;
    use kc_storage_column::{InMemoryKeyspace, column_entity_stores};

    use crate::CompositeRepository;

    pub fn repository() -> (CompositeRepository, Arc<InMemoryKeyspace>) {
        let keyspace = Arc::new(InMemoryKeyspace::new(Clock::new()));
        let stores = column_entity_stores(keyspace.clone());
        (
            CompositeRepository::new(stores, Arc::new(RequestCache::new())),
            keyspace,
        )
    }
}
