//! Column-store login failure store.

use std::sync::Arc;

use async_trait::async_trait;
use kc_model::LoginFailure;
use kc_storage::{LoginFailureStore, StorageResult};
use uuid::Uuid;

use crate::boundary::ColumnStore;
use crate::schema;
use crate::table::Table;

const FAILURES: Table = Table::new(schema::LOGIN_FAILURES);

/// Login failure store over a [`ColumnStore`].
pub struct ColumnLoginFailureStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnLoginFailureStore {
    /// Creates a login failure store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LoginFailureStore for ColumnLoginFailureStore {
    async fn upsert(&self, failure: &LoginFailure) -> StorageResult<()> {
        FAILURES
            .put(
                &self.store,
                &failure.realm_id.to_string(),
                &failure.user_id.to_string(),
                failure,
                None,
            )
            .await
    }

    async fn delete(&self, realm_id: Uuid, user_id: Uuid) -> StorageResult<bool> {
        FAILURES
            .remove(&self.store, &realm_id.to_string(), &user_id.to_string())
            .await
    }

    async fn get(&self, realm_id: Uuid, user_id: Uuid) -> StorageResult<Option<LoginFailure>> {
        FAILURES
            .get(&self.store, &realm_id.to_string(), &user_id.to_string())
            .await
    }

    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<()> {
        FAILURES
            .remove_partition(&self.store, &realm_id.to_string())
            .await
    }
}
