//! Common test utilities and fixtures.

use std::sync::Arc;

use kc_cache::RequestCache;
use kc_core::Clock;
use kc_repository::CompositeRepository;
use kc_spi::{MapConfig, ProviderFactory};
use kc_storage_column::{InMemoryKeyspace, column_entity_stores};
use kc_store::{ColumnStoreProviderFactory, StoreSession};
use uuid::Uuid;

/// Test environment: one keyspace, one clock, one initialized factory.
pub struct TestEnv {
    /// Backing keyspace, for read/write counters.
    pub keyspace: Arc<InMemoryKeyspace>,
    /// Shared clock.
    pub clock: Clock,
    /// Initialized factory.
    pub factory: ColumnStoreProviderFactory,
}

impl TestEnv {
    /// Creates an environment with the default configuration.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(MapConfig::new()).await
    }

    /// Creates an environment with a custom factory configuration.
    pub async fn with_config(config: MapConfig) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("kc_store=debug,kc_session=debug,kc_spi=debug")
            .with_test_writer()
            .try_init();

        let clock = Clock::new();
        let keyspace = Arc::new(InMemoryKeyspace::new(clock.clone()));
        let mut factory = ColumnStoreProviderFactory::new(keyspace.clone(), clock.clone());
        factory.init(&config).await?;

        Ok(Self {
            keyspace,
            clock,
            factory,
        })
    }

    /// Starts a request.
    pub fn request(&self) -> anyhow::Result<StoreSession> {
        Ok(self.factory.create()?)
    }

    /// A bare repository with its own cache, bypassing the adapters.
    pub fn repository(&self) -> CompositeRepository {
        CompositeRepository::new(
            column_entity_stores(self.keyspace.clone()),
            Arc::new(RequestCache::new()),
        )
    }

    /// Creates and commits realm `test` with client `test-client`.
    pub async fn realm_with_client(&self) -> anyhow::Result<(Uuid, Uuid)> {
        let request = self.request()?;
        let realm = request.realms().create_realm(None, "test").await?;
        let client = request
            .clients()
            .add_client(realm.id(), None, "test-client")
            .await?;
        let ids = (realm.id(), client.id());
        request.commit().await?;
        Ok(ids)
    }
}
