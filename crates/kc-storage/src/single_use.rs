//! Single-use object entity store trait.

use async_trait::async_trait;
use kc_model::SingleUseObject;

use crate::error::StorageResult;

/// Store for globally keyed single-use objects.
#[async_trait]
pub trait SingleUseObjectStore: Send + Sync {
    /// Writes an object, overwriting any existing one.
    async fn put(&self, object: &SingleUseObject, ttl: i64) -> StorageResult<()>;

    /// Writes an object only if the key is free. Returns whether it was written.
    async fn put_if_absent(&self, object: &SingleUseObject, ttl: i64) -> StorageResult<bool>;

    /// Gets an object.
    async fn get(&self, key: &str) -> StorageResult<Option<SingleUseObject>>;

    /// Deletes an object. Returns whether it existed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;
}
