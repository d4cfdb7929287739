//! Column-store single-use object store.

use std::sync::Arc;

use async_trait::async_trait;
use kc_model::SingleUseObject;
use kc_storage::{SingleUseObjectStore, StorageResult};

use crate::boundary::ColumnStore;
use crate::codec::encode;
use crate::schema;
use crate::table::Table;

const OBJECTS: Table = Table::new(schema::SINGLE_USE_OBJECTS);

/// Single-use object store over a [`ColumnStore`], one partition per key.
pub struct ColumnSingleUseObjectStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnSingleUseObjectStore {
    /// Creates a single-use object store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SingleUseObjectStore for ColumnSingleUseObjectStore {
    async fn put(&self, object: &SingleUseObject, ttl: i64) -> StorageResult<()> {
        OBJECTS
            .put(&self.store, &object.key, "", object, Some(ttl))
            .await
    }

    async fn put_if_absent(&self, object: &SingleUseObject, ttl: i64) -> StorageResult<bool> {
        let existing = self
            .store
            .insert_if_not_exists(
                schema::SINGLE_USE_OBJECTS,
                &object.key,
                "",
                encode(object)?,
                Some(ttl),
            )
            .await?;
        Ok(existing.is_none())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<SingleUseObject>> {
        OBJECTS.get(&self.store, key, "").await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        OBJECTS.remove(&self.store, key, "").await
    }
}
