use kc_model::User;
use kc_storage::{StorageResult, UserSearchCriteria};
use uuid::Uuid;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Duplicate username or service-account link, or store failure.
    pub async fn create_user(&self, user: &User) -> StorageResult<()> {
        self.cache
            .intercept_write(tags::CREATE_USER, self.stores.users.create(user))
            .await
    }

    /// Writes a changed user, re-indexing from `previous`.
    ///
    /// # Errors
    ///
    /// Duplicate username or service-account link, or store failure.
    pub async fn update_user(&self, previous: &User, user: &User) -> StorageResult<()> {
        self.cache
            .intercept_write(tags::UPDATE_USER, self.stores.users.update(previous, user))
            .await
    }

    /// Deletes a user. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_user(&self, user: &User) -> StorageResult<bool> {
        self.cache
            .intercept_write(tags::DELETE_USER, self.stores.users.delete(user))
            .await
    }

    /// Gets a user by ID.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<User>> {
        self.cache
            .intercept_read(
                tags::GET_USER,
                &(realm_id, id),
                self.stores.users.get_by_id(realm_id, id),
            )
            .await
    }

    /// Gets a user by username.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_by_username(
        &self,
        realm_id: Uuid,
        username: &str,
    ) -> StorageResult<Option<User>> {
        self.cache
            .intercept_read(
                tags::GET_USER_BY_USERNAME,
                &(realm_id, username),
                self.stores.users.get_by_username(realm_id, username),
            )
            .await
    }

    /// Gets users by email.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_users_by_email(&self, realm_id: Uuid, email: &str) -> StorageResult<Vec<User>> {
        self.cache
            .intercept_read(
                tags::GET_USERS_BY_EMAIL,
                &(realm_id, email),
                self.stores.users.get_by_email(realm_id, email),
            )
            .await
    }

    /// Gets users linked to a federation provider.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_users_by_federation_link(
        &self,
        realm_id: Uuid,
        link: &str,
    ) -> StorageResult<Vec<User>> {
        self.cache
            .intercept_read(
                tags::GET_USERS_BY_FEDERATION_LINK,
                &(realm_id, link),
                self.stores.users.get_by_federation_link(realm_id, link),
            )
            .await
    }

    /// Gets the service account of a client.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_service_account_user(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
    ) -> StorageResult<Option<User>> {
        self.cache
            .intercept_read(
                tags::GET_SERVICE_ACCOUNT_USER,
                &(realm_id, client_id),
                self.stores.users.get_service_account(realm_id, client_id),
            )
            .await
    }

    /// Gets users having an attribute value.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_users_by_attribute(
        &self,
        realm_id: Uuid,
        name: &str,
        value: &str,
    ) -> StorageResult<Vec<User>> {
        self.cache
            .intercept_read(
                tags::GET_USERS_BY_ATTRIBUTE,
                &(realm_id, name, value),
                self.stores.users.get_by_attribute(realm_id, name, value),
            )
            .await
    }

    /// Searches users.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn search_users(
        &self,
        realm_id: Uuid,
        criteria: &UserSearchCriteria,
    ) -> StorageResult<Vec<User>> {
        self.cache
            .intercept_read(
                tags::SEARCH_USERS,
                &(realm_id, criteria),
                self.stores.users.search(realm_id, criteria),
            )
            .await
    }

    /// Counts users matching criteria.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn count_users(
        &self,
        realm_id: Uuid,
        criteria: &UserSearchCriteria,
    ) -> StorageResult<u64> {
        self.cache
            .intercept_read(
                tags::COUNT_USERS,
                &(realm_id, criteria),
                self.stores.users.count(realm_id, criteria),
            )
            .await
    }
}
