//! User session entity store trait.

use async_trait::async_trait;
use kc_model::UserSession;
use uuid::Uuid;

use crate::error::StorageResult;

/// Store for user sessions, online and offline.
///
/// Client sessions are embedded in their user session row. Index rows map
/// user, broker session, broker user and client to session ids, split by the
/// `offline` flag.
#[async_trait]
pub trait UserSessionStore: Send + Sync {
    /// Writes a session and its index rows.
    ///
    /// Index rows present for `previous` but not for `session` are removed.
    /// `ttl` is the store-native time to live in seconds.
    async fn upsert(
        &self,
        previous: Option<&UserSession>,
        session: &UserSession,
        ttl: Option<i64>,
    ) -> StorageResult<()>;

    /// Deletes a session and its index rows. Returns whether it existed.
    async fn delete(&self, session: &UserSession) -> StorageResult<bool>;

    /// Gets a session by ID.
    async fn get(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<UserSession>>;

    /// Gets all sessions of a realm.
    async fn find_by_realm(&self, realm_id: Uuid, offline: bool) -> StorageResult<Vec<UserSession>>;

    /// Gets sessions of a user.
    async fn find_by_user(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>>;

    /// Gets sessions created by an identity broker session.
    async fn find_by_broker_session(
        &self,
        realm_id: Uuid,
        broker_session_id: &str,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>>;

    /// Gets sessions of a brokered user.
    async fn find_by_broker_user(
        &self,
        realm_id: Uuid,
        broker_user_id: &str,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>>;

    /// Gets sessions holding a client session for a client.
    async fn find_by_client(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>>;
}
