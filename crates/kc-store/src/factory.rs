//! Column-store provider factory.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use kc_cache::RequestCache;
use kc_core::config::{AUTH_SESSIONS_LIMIT_KEY, resolve_auth_sessions_limit};
use kc_core::{Clock, Config};
use kc_repository::CompositeRepository;
use kc_spi::{FactoryConfig, KeycloakSession, ProviderFactory, ProviderMetadata, SpiError};
use kc_storage::EntityStores;
use kc_storage_column::{ColumnStore, column_entity_stores, schema};
use tracing::{debug, info, warn};

use crate::session::StoreSession;
use crate::settings::StoreSettings;

/// Factory ID.
pub const PROVIDER_ID: &str = "column-store";

/// State fixed by [`ProviderFactory::init`].
struct Initialized {
    stores: EntityStores,
    config: Arc<Config>,
}

/// Creates one [`StoreSession`] per request over a shared column store.
///
/// ## Lifecycle
///
/// 1. [`new`](Self::new) with the store connection and clock
/// 2. `init()` once; resolves `authSessionsLimit` and builds the entity stores
/// 3. `create()` per request
/// 4. `close()` at shutdown; shuts the store down, never fails
pub struct ColumnStoreProviderFactory {
    store: Arc<dyn ColumnStore>,
    clock: Clock,
    settings: StoreSettings,
    initialized: Option<Initialized>,
    closed: AtomicBool,
}

impl fmt::Debug for ColumnStoreProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnStoreProviderFactory")
            .field("settings", &self.settings)
            .field("initialized", &self.initialized.is_some())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl ColumnStoreProviderFactory {
    /// Creates an uninitialized factory with default settings.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>, clock: Clock) -> Self {
        Self {
            store,
            clock,
            settings: StoreSettings::default(),
            initialized: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Replaces the settings used as defaults by `init()`.
    #[must_use]
    pub fn with_settings(mut self, settings: StoreSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Settings the factory was built with.
    #[must_use]
    pub const fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Time source shared by every request.
    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Provider options in effect, once initialized.
    #[must_use]
    pub fn config(&self) -> Option<&Config> {
        self.initialized.as_ref().map(|state| state.config.as_ref())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ProviderFactory for ColumnStoreProviderFactory {
    type Provider = StoreSession;

    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            id: PROVIDER_ID,
            name: "Column store",
            description: "Realms, users, clients, roles and sessions on a distributed column store",
        }
    }

    async fn init(&mut self, config: &dyn FactoryConfig) -> Result<(), SpiError> {
        if self.is_closed() {
            return Err(SpiError::InitializationFailed(
                "factory already closed".to_string(),
            ));
        }

        let auth_sessions_limit = match config.get(AUTH_SESSIONS_LIMIT_KEY) {
            Some(raw) => resolve_auth_sessions_limit(Some(raw)),
            None => self.settings.provider.auth_sessions_limit,
        };
        let provider = Config::new().auth_sessions_limit(auth_sessions_limit);

        let statements = schema::create_statements(&self.settings.connection);
        for statement in &statements {
            debug!(%statement, "schema statement");
        }

        self.initialized = Some(Initialized {
            stores: column_entity_stores(Arc::clone(&self.store)),
            config: Arc::new(provider),
        });
        info!(
            keyspace = %self.settings.connection.keyspace,
            auth_sessions_limit,
            statements = statements.len(),
            "column store provider initialized"
        );
        Ok(())
    }

    fn create(&self) -> Result<StoreSession, SpiError> {
        if self.is_closed() {
            return Err(SpiError::CreationFailed("factory closed".to_string()));
        }
        let state = self
            .initialized
            .as_ref()
            .ok_or_else(|| SpiError::CreationFailed("factory not initialized".to_string()))?;

        let repo = CompositeRepository::new(state.stores.clone(), Arc::new(RequestCache::new()));
        let session = KeycloakSession::new(
            Arc::new(repo),
            self.clock.clone(),
            Arc::clone(&state.config),
        );
        debug!(session = %session.id(), "request session created");
        Ok(StoreSession::new(Arc::new(session)))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self.store.shutdown().await {
            warn!(error = %err, "column store shutdown failed");
        }
        info!("column store provider closed");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use kc_spi::MapConfig;
    use kc_storage::{StorageError, StorageResult};
    use kc_storage_column::{InMemoryKeyspace, Row};

    use super::*;

    fn factory() -> ColumnStoreProviderFactory {
        let clock = Clock::new();
        ColumnStoreProviderFactory::new(Arc::new(InMemoryKeyspace::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn init_reads_auth_sessions_limit() {
        let mut factory = factory();
        factory
            .init(&MapConfig::new().with(AUTH_SESSIONS_LIMIT_KEY, "2"))
            .await
            .unwrap();

        let request = factory.create().unwrap();
        assert_eq!(request.session().config().auth_sessions_limit, 2);
    }

    #[tokio::test]
    async fn invalid_limit_falls_back_to_default() {
        for raw in ["0", "-1", "many"] {
            let mut factory = factory();
            factory
                .init(&MapConfig::new().with(AUTH_SESSIONS_LIMIT_KEY, raw))
                .await
                .unwrap();
            assert_eq!(factory.config().unwrap().auth_sessions_limit, 300);
        }
    }

    #[tokio::test]
    async fn settings_limit_used_when_config_silent() {
        let mut factory = factory().with_settings(StoreSettings {
            provider: Config::new().auth_sessions_limit(5),
            ..StoreSettings::default()
        });
        factory.init(&MapConfig::new()).await.unwrap();

        assert_eq!(factory.config().unwrap().auth_sessions_limit, 5);
    }

    #[tokio::test]
    async fn create_requires_init_and_open_factory() {
        let mut factory = factory();
        assert!(factory.create().is_err());

        factory.init(&MapConfig::new()).await.unwrap();
        let first = factory.create().unwrap();
        let second = factory.create().unwrap();
        assert_ne!(first.session().id(), second.session().id());

        factory.close().await;
        factory.close().await;
        assert!(matches!(factory.create(), Err(SpiError::CreationFailed(_))));
        assert!(factory.init(&MapConfig::new()).await.is_err());
    }

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl ColumnStore for BrokenStore {
        async fn insert(
            &self,
            _table: &str,
            _partition: &str,
            _clustering: &str,
            _value: Vec<u8>,
            _ttl: Option<i64>,
        ) -> StorageResult<()> {
            Err(StorageError::store("down"))
        }

        async fn insert_if_not_exists(
            &self,
            _table: &str,
            _partition: &str,
            _clustering: &str,
            _value: Vec<u8>,
            _ttl: Option<i64>,
        ) -> StorageResult<Option<Vec<u8>>> {
            Err(StorageError::store("down"))
        }

        async fn select(
            &self,
            _table: &str,
            _partition: &str,
            _clustering: &str,
        ) -> StorageResult<Option<Vec<u8>>> {
            Err(StorageError::store("down"))
        }

        async fn select_partition(&self, _table: &str, _partition: &str) -> StorageResult<Vec<Row>> {
            Err(StorageError::store("down"))
        }

        async fn delete(&self, _table: &str, _partition: &str, _clustering: &str) -> StorageResult<bool> {
            Err(StorageError::store("down"))
        }

        async fn delete_partition(&self, _table: &str, _partition: &str) -> StorageResult<()> {
            Err(StorageError::store("down"))
        }

        async fn shutdown(&self) -> StorageResult<()> {
            Err(StorageError::store("down"))
        }
    }

    #[tokio::test]
    async fn close_swallows_shutdown_failure() {
        let mut factory = ColumnStoreProviderFactory::new(Arc::new(BrokenStore), Clock::new());
        factory.init(&MapConfig::new()).await.unwrap();

        factory.close().await;

        assert!(factory.create().is_err());
    }
}
