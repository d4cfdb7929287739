use kc_model::UserSession;
use kc_storage::StorageResult;
use uuid::Uuid;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Writes a user session with its index rows.
    ///
    /// `previous` is the last persisted copy, used to drop stale index rows.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn upsert_user_session(
        &self,
        previous: Option<&UserSession>,
        session: &UserSession,
        ttl: Option<i64>,
    ) -> StorageResult<()> {
        self.cache
            .intercept_write(
                tags::UPSERT_USER_SESSION,
                self.stores.user_sessions.upsert(previous, session, ttl),
            )
            .await
    }

    /// Deletes a user session. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_user_session(&self, session: &UserSession) -> StorageResult<bool> {
        self.cache
            .intercept_write(
                tags::DELETE_USER_SESSION,
                self.stores.user_sessions.delete(session),
            )
            .await
    }

    /// Gets a user session by ID, online or offline.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_session(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<UserSession>> {
        self.cache
            .intercept_read(
                tags::GET_USER_SESSION,
                &(realm_id, id),
                self.stores.user_sessions.get(realm_id, id),
            )
            .await
    }

    /// Gets every session of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn find_user_sessions_by_realm(
        &self,
        realm_id: Uuid,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.cache
            .intercept_read(
                tags::FIND_USER_SESSIONS_BY_REALM,
                &(realm_id, offline),
                self.stores.user_sessions.find_by_realm(realm_id, offline),
            )
            .await
    }

    /// Gets the sessions of a user.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn find_user_sessions_by_user(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.cache
            .intercept_read(
                tags::FIND_USER_SESSIONS_BY_USER,
                &(realm_id, user_id, offline),
                self.stores
                    .user_sessions
                    .find_by_user(realm_id, user_id, offline),
            )
            .await
    }

    /// Gets the sessions created by a broker session.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn find_user_sessions_by_broker_session(
        &self,
        realm_id: Uuid,
        broker_session_id: &str,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.cache
            .intercept_read(
                tags::FIND_USER_SESSIONS_BY_BROKER_SESSION,
                &(realm_id, broker_session_id, offline),
                self.stores
                    .user_sessions
                    .find_by_broker_session(realm_id, broker_session_id, offline),
            )
            .await
    }

    /// Gets the sessions of a brokered user.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn find_user_sessions_by_broker_user(
        &self,
        realm_id: Uuid,
        broker_user_id: &str,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.cache
            .intercept_read(
                tags::FIND_USER_SESSIONS_BY_BROKER_USER,
                &(realm_id, broker_user_id, offline),
                self.stores
                    .user_sessions
                    .find_by_broker_user(realm_id, broker_user_id, offline),
            )
            .await
    }

    /// Gets the sessions holding a client session for a client.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn find_user_sessions_by_client(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.cache
            .intercept_read(
                tags::FIND_USER_SESSIONS_BY_CLIENT,
                &(realm_id, client_id, offline),
                self.stores
                    .user_sessions
                    .find_by_client(realm_id, client_id, offline),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use kc_model::UserSession;
    use uuid::Uuid;

    use crate::test_support::repository;

    #[tokio::test]
    async fn session_write_leaves_other_partitions_cached() {
        let (repo, keyspace) = repository();
        let realm_id = Uuid::now_v7();
        repo.get_user(realm_id, Uuid::now_v7()).await.unwrap();

        let session = UserSession::new(realm_id, Uuid::now_v7(), "alice", 1_000);
        repo.upsert_user_session(None, &session, None).await.unwrap();

        assert_eq!(repo.cache().len(kc_cache::caches::USERS), 1);
        let found = repo.get_user_session(realm_id, session.id).await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(session.id));

        let reads = keyspace.reads();
        repo.get_user_session(realm_id, session.id).await.unwrap();
        assert_eq!(keyspace.reads(), reads);
    }

    #[tokio::test]
    async fn delete_twice_returns_false() {
        let (repo, _keyspace) = repository();
        let session = UserSession::new(Uuid::now_v7(), Uuid::now_v7(), "bob", 1_000);
        repo.upsert_user_session(None, &session, None).await.unwrap();

        assert!(repo.delete_user_session(&session).await.unwrap());
        assert!(!repo.delete_user_session(&session).await.unwrap());
    }
}
