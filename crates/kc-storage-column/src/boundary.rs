//! Boundary to the column-store driver.
//!
//! Every table has the same shape: a text partition key, a text clustering
//! key and an opaque value. A driver binding maps these calls onto CQL
//! statements; [`crate::InMemoryKeyspace`] evaluates them in process.

use async_trait::async_trait;
use kc_storage::StorageResult;

/// One clustering row of a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Clustering key.
    pub clustering: String,
    /// Stored value.
    pub value: Vec<u8>,
}

/// Operations the entity stores issue against the column store.
///
/// Time to live is given in seconds; `None` or a non-positive value stores
/// the row without expiry. Store errors are reported as
/// [`kc_storage::StorageError::Store`] and never retried here.
#[async_trait]
pub trait ColumnStore: Send + Sync {
    /// `INSERT` (upsert) a row.
    async fn insert(
        &self,
        table: &str,
        partition: &str,
        clustering: &str,
        value: Vec<u8>,
        ttl: Option<i64>,
    ) -> StorageResult<()>;

    /// `INSERT ... IF NOT EXISTS`.
    ///
    /// Returns `None` when applied, or the value already present.
    async fn insert_if_not_exists(
        &self,
        table: &str,
        partition: &str,
        clustering: &str,
        value: Vec<u8>,
        ttl: Option<i64>,
    ) -> StorageResult<Option<Vec<u8>>>;

    /// Selects one row.
    async fn select(
        &self,
        table: &str,
        partition: &str,
        clustering: &str,
    ) -> StorageResult<Option<Vec<u8>>>;

    /// Selects every live row of a partition, ordered by clustering key.
    async fn select_partition(&self, table: &str, partition: &str) -> StorageResult<Vec<Row>>;

    /// Deletes one row. Returns whether a live row existed.
    async fn delete(&self, table: &str, partition: &str, clustering: &str) -> StorageResult<bool>;

    /// Deletes a whole partition.
    async fn delete_partition(&self, table: &str, partition: &str) -> StorageResult<()>;

    /// Releases driver resources.
    async fn shutdown(&self) -> StorageResult<()>;
}
