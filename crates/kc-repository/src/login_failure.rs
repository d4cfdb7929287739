use kc_model::LoginFailure;
use kc_storage::StorageResult;
use uuid::Uuid;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Writes a login failure record.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn upsert_login_failure(&self, failure: &LoginFailure) -> StorageResult<()> {
        self.cache
            .intercept_write(
                tags::UPSERT_LOGIN_FAILURE,
                self.stores.login_failures.upsert(failure),
            )
            .await
    }

    /// Deletes the login failure record of a user. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_login_failure(&self, realm_id: Uuid, user_id: Uuid) -> StorageResult<bool> {
        self.cache
            .intercept_write(
                tags::DELETE_LOGIN_FAILURE,
                self.stores.login_failures.delete(realm_id, user_id),
            )
            .await
    }

    /// Deletes every login failure record of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_login_failures_by_realm(&self, realm_id: Uuid) -> StorageResult<()> {
        self.cache
            .intercept_write(
                tags::DELETE_LOGIN_FAILURES_BY_REALM,
                self.stores.login_failures.delete_by_realm(realm_id),
            )
            .await
    }

    /// Gets the login failure record of a user.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_login_failure(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
    ) -> StorageResult<Option<LoginFailure>> {
        self.cache
            .intercept_read(
                tags::GET_LOGIN_FAILURE,
                &(realm_id, user_id),
                self.stores.login_failures.get(realm_id, user_id),
            )
            .await
    }
}
