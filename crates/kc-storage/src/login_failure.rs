//! Login failure entity store trait.

use async_trait::async_trait;
use kc_model::LoginFailure;
use uuid::Uuid;

use crate::error::StorageResult;

/// Store for brute-force protection records, keyed by realm and user.
#[async_trait]
pub trait LoginFailureStore: Send + Sync {
    /// Writes a record.
    async fn upsert(&self, failure: &LoginFailure) -> StorageResult<()>;

    /// Deletes a record. Returns whether it existed.
    async fn delete(&self, realm_id: Uuid, user_id: Uuid) -> StorageResult<bool>;

    /// Gets a record.
    async fn get(&self, realm_id: Uuid, user_id: Uuid) -> StorageResult<Option<LoginFailure>>;

    /// Deletes all records of a realm.
    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<()>;
}
