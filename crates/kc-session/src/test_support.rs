use std::sync::Arc;

use kc_cache::RequestCache;
use kc_core::{Clock, Config};
use kc_provider::{ClientProvider, RealmProvider};
use kc_repository::CompositeRepository;
use kc_spi::KeycloakSession;
use kc_storage::EntityStores;
use kc_storage_column::{InMemoryKeyspace, column_entity_stores};
use uuid::Uuid;

pub struct Harness {
    pub stores: EntityStores,
    pub clock: Clock,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Clock::new();
        let stores = column_entity_stores(Arc::new(InMemoryKeyspace::new(clock.clone())));
        Self { stores, clock }
    }

    pub fn session(&self) -> Arc<KeycloakSession> {
        self.session_with(Config::default())
    }

    pub fn session_with(&self, config: Config) -> Arc<KeycloakSession> {
        let repo = CompositeRepository::new(self.stores.clone(), Arc::new(RequestCache::new()));
        Arc::new(KeycloakSession::new(
            Arc::new(repo),
            self.clock.clone(),
            Arc::new(config),
        ))
    }

    /// Creates realm `acme` with client `app`.
    pub async fn realm_and_client(&self, session: &Arc<KeycloakSession>) -> (Uuid, Uuid) {
        let realm = RealmProvider::new(Arc::clone(session))
            .create_realm(None, "acme")
            .await
            .unwrap();
        let client = ClientProvider::new(Arc::clone(session))
            .add_client(realm.id(), None, "app")
            .await
            .unwrap();
        (realm.id(), client.id())
    }
}
