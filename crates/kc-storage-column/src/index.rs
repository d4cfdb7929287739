//! Secondary index tables.
//!
//! Index rows are pure pointers to a primary row id. They are written and
//! removed together with the primary row; a pointer whose target is gone is
//! treated as not found by the readers.

use std::sync::Arc;

use kc_storage::StorageResult;
use uuid::Uuid;

use crate::boundary::ColumnStore;

/// Builds an index partition key from its parts.
pub fn key(parts: &[&str]) -> String {
    parts.join(":")
}

fn parse_id(bytes: &[u8]) -> Option<Uuid> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Index mapping a value to at most one id.
#[derive(Debug, Clone, Copy)]
pub struct UniqueIndex {
    table: &'static str,
}

impl UniqueIndex {
    /// Index over a table.
    #[must_use]
    pub const fn new(table: &'static str) -> Self {
        Self { table }
    }

    /// Claims `key` for `id`. Returns false if another id holds it.
    ///
    /// Re-claiming a key already held by `id` succeeds.
    pub async fn claim(
        &self,
        store: &Arc<dyn ColumnStore>,
        key: &str,
        id: Uuid,
        ttl: Option<i64>,
    ) -> StorageResult<bool> {
        let existing = store
            .insert_if_not_exists(self.table, key, "", id.to_string().into_bytes(), ttl)
            .await?;
        Ok(existing.is_none_or(|bytes| parse_id(&bytes) == Some(id)))
    }

    /// Returns the id holding `key`.
    pub async fn lookup(&self, store: &Arc<dyn ColumnStore>, key: &str) -> StorageResult<Option<Uuid>> {
        Ok(store
            .select(self.table, key, "")
            .await?
            .and_then(|bytes| parse_id(&bytes)))
    }

    /// Releases `key` if `id` holds it.
    pub async fn release(&self, store: &Arc<dyn ColumnStore>, key: &str, id: Uuid) -> StorageResult<()> {
        if self.lookup(store, key).await? == Some(id) {
            store.delete(self.table, key, "").await?;
        }
        Ok(())
    }
}

/// Index mapping a value to any number of ids.
#[derive(Debug, Clone, Copy)]
pub struct MultiIndex {
    table: &'static str,
}

impl MultiIndex {
    /// Index over a table.
    #[must_use]
    pub const fn new(table: &'static str) -> Self {
        Self { table }
    }

    /// Adds `id` under `key`.
    pub async fn add(
        &self,
        store: &Arc<dyn ColumnStore>,
        key: &str,
        id: Uuid,
        ttl: Option<i64>,
    ) -> StorageResult<()> {
        let id = id.to_string();
        store
            .insert(self.table, key, &id, id.clone().into_bytes(), ttl)
            .await
    }

    /// Removes `id` from `key`.
    pub async fn remove(&self, store: &Arc<dyn ColumnStore>, key: &str, id: Uuid) -> StorageResult<()> {
        store.delete(self.table, key, &id.to_string()).await?;
        Ok(())
    }

    /// Returns the ids under `key`.
    pub async fn ids(&self, store: &Arc<dyn ColumnStore>, key: &str) -> StorageResult<Vec<Uuid>> {
        Ok(store
            .select_partition(self.table, key)
            .await?
            .iter()
            .filter_map(|row| parse_id(&row.value))
            .collect())
    }
}
