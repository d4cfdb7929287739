//! Realm entity store trait.

use async_trait::async_trait;
use kc_model::Realm;
use uuid::Uuid;

use crate::error::StorageResult;

/// Store for realms.
///
/// Realms are global: they are not partitioned by another realm.
#[async_trait]
pub trait RealmStore: Send + Sync {
    /// Creates a new realm.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a realm with the same name exists.
    async fn create(&self, realm: &Realm) -> StorageResult<()>;

    /// Writes a changed realm, re-indexing the name from `previous`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the new name is taken.
    async fn update(&self, previous: &Realm, realm: &Realm) -> StorageResult<()>;

    /// Deletes a realm and its name index row. Returns whether it existed.
    async fn delete(&self, realm: &Realm) -> StorageResult<bool>;

    /// Gets a realm by ID.
    async fn get_by_id(&self, id: Uuid) -> StorageResult<Option<Realm>>;

    /// Gets a realm by name.
    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Realm>>;

    /// Lists all realms.
    async fn list(&self) -> StorageResult<Vec<Realm>>;
}
