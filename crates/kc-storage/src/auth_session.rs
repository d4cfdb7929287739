//! Authentication session entity store trait.

use async_trait::async_trait;
use kc_model::RootAuthenticationSession;
use uuid::Uuid;

use crate::error::StorageResult;

/// Store for root authentication sessions with their embedded children.
#[async_trait]
pub trait AuthSessionStore: Send + Sync {
    /// Writes a root session with a time to live in seconds.
    async fn upsert(&self, root: &RootAuthenticationSession, ttl: Option<i64>)
    -> StorageResult<()>;

    /// Deletes a root session. Returns whether it existed.
    async fn delete(&self, realm_id: Uuid, id: Uuid) -> StorageResult<bool>;

    /// Gets a root session by ID.
    async fn get(&self, realm_id: Uuid, id: Uuid)
    -> StorageResult<Option<RootAuthenticationSession>>;

    /// Gets all root sessions of a realm.
    async fn find_by_realm(&self, realm_id: Uuid) -> StorageResult<Vec<RootAuthenticationSession>>;

    /// Deletes all root sessions of a realm.
    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<()>;
}
