use std::sync::Arc;

use kc_cache::RequestCache;
use kc_core::{Clock, Config};
use kc_repository::CompositeRepository;
use kc_spi::KeycloakSession;
use kc_storage::EntityStores;
use kc_storage_column::{InMemoryKeyspace, column_entity_stores};

pub struct Harness {
    pub keyspace: Arc<InMemoryKeyspace>,
    pub stores: EntityStores,
    pub clock: Clock,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Clock::new();
        let keyspace = Arc::new(InMemoryKeyspace::new(clock.clone()));
        let stores = column_entity_stores(keyspace.clone());
        Self {
            keyspace,
            stores,
            clock,
        }
    }

    pub fn session(&self) -> Arc<KeycloakSession> {
        let repo = CompositeRepository::new(self.stores.clone(), Arc::new(RequestCache::new()));
        Arc::new(KeycloakSession::new(
            Arc::new(repo),
            self.clock.clone(),
            Arc::new(Config::default()),
        ))
    }
}
