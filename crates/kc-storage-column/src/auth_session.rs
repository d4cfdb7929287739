//! Column-store authentication session store.

use std::sync::Arc;

use async_trait::async_trait;
use kc_model::RootAuthenticationSession;
use kc_storage::{AuthSessionStore, StorageResult};
use uuid::Uuid;

use crate::boundary::ColumnStore;
use crate::schema;
use crate::table::Table;

const ROOTS: Table = Table::new(schema::AUTH_SESSIONS);

/// Root authentication session store over a [`ColumnStore`].
pub struct ColumnAuthSessionStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnAuthSessionStore {
    /// Creates an authentication session store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthSessionStore for ColumnAuthSessionStore {
    async fn upsert(
        &self,
        root: &RootAuthenticationSession,
        ttl: Option<i64>,
    ) -> StorageResult<()> {
        ROOTS
            .put(
                &self.store,
                &root.realm_id.to_string(),
                &root.id.to_string(),
                root,
                ttl,
            )
            .await
    }

    async fn delete(&self, realm_id: Uuid, id: Uuid) -> StorageResult<bool> {
        ROOTS
            .remove(&self.store, &realm_id.to_string(), &id.to_string())
            .await
    }

    async fn get(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<RootAuthenticationSession>> {
        ROOTS
            .get(&self.store, &realm_id.to_string(), &id.to_string())
            .await
    }

    async fn find_by_realm(&self, realm_id: Uuid) -> StorageResult<Vec<RootAuthenticationSession>> {
        ROOTS.all(&self.store, &realm_id.to_string()).await
    }

    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<()> {
        ROOTS
            .remove_partition(&self.store, &realm_id.to_string())
            .await
    }
}
