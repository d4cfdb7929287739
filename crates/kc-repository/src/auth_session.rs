use kc_model::RootAuthenticationSession;
use kc_storage::StorageResult;
use uuid::Uuid;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Writes a root authentication session with all its tabs.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn upsert_root_auth_session(
        &self,
        root: &RootAuthenticationSession,
        ttl: Option<i64>,
    ) -> StorageResult<()> {
        self.cache
            .intercept_write(
                tags::UPSERT_ROOT_AUTH_SESSION,
                self.stores.auth_sessions.upsert(root, ttl),
            )
            .await
    }

    /// Deletes a root authentication session. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_root_auth_session(&self, realm_id: Uuid, id: Uuid) -> StorageResult<bool> {
        self.cache
            .intercept_write(
                tags::DELETE_ROOT_AUTH_SESSION,
                self.stores.auth_sessions.delete(realm_id, id),
            )
            .await
    }

    /// Deletes every root authentication session of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_root_auth_sessions_by_realm(&self, realm_id: Uuid) -> StorageResult<()> {
        self.cache
            .intercept_write(
                tags::DELETE_ROOT_AUTH_SESSIONS_BY_REALM,
                self.stores.auth_sessions.delete_by_realm(realm_id),
            )
            .await
    }

    /// Gets a root authentication session.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_root_auth_session(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<RootAuthenticationSession>> {
        self.cache
            .intercept_read(
                tags::GET_ROOT_AUTH_SESSION,
                &(realm_id, id),
                self.stores.auth_sessions.get(realm_id, id),
            )
            .await
    }

    /// Gets every root authentication session of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn find_root_auth_sessions_by_realm(
        &self,
        realm_id: Uuid,
    ) -> StorageResult<Vec<RootAuthenticationSession>> {
        self.cache
            .intercept_read(
                tags::FIND_ROOT_AUTH_SESSIONS_BY_REALM,
                &realm_id,
                self.stores.auth_sessions.find_by_realm(realm_id),
            )
            .await
    }
}
