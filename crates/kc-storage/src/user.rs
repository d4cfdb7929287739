//! User entity store trait.

use async_trait::async_trait;
use kc_model::User;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StorageResult;

/// Store for users.
///
/// Besides the primary row, implementations keep index rows for username,
/// email, federation link, service account link and attribute values.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates a new user.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a user with the same username exists.
    async fn create(&self, user: &User) -> StorageResult<()>;

    /// Writes a changed user, moving index rows from `previous`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a changed username is taken.
    async fn update(&self, previous: &User, user: &User) -> StorageResult<()>;

    /// Deletes a user with all its index rows. Returns whether it existed.
    async fn delete(&self, user: &User) -> StorageResult<bool>;

    /// Gets a user by ID.
    async fn get_by_id(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<User>>;

    /// Gets a user by username.
    async fn get_by_username(&self, realm_id: Uuid, username: &str) -> StorageResult<Option<User>>;

    /// Gets the users with an email address. More than one only when the
    /// realm allows duplicate emails.
    async fn get_by_email(&self, realm_id: Uuid, email: &str) -> StorageResult<Vec<User>>;

    /// Gets users linked to a federation provider.
    async fn get_by_federation_link(&self, realm_id: Uuid, link: &str) -> StorageResult<Vec<User>>;

    /// Gets the service account user for a client.
    async fn get_service_account(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
    ) -> StorageResult<Option<User>>;

    /// Gets users having an attribute value.
    async fn get_by_attribute(
        &self,
        realm_id: Uuid,
        name: &str,
        value: &str,
    ) -> StorageResult<Vec<User>>;

    /// Searches for users matching criteria, ordered by username.
    async fn search(
        &self,
        realm_id: Uuid,
        criteria: &UserSearchCriteria,
    ) -> StorageResult<Vec<User>>;

    /// Counts users matching criteria (pagination ignored).
    async fn count(&self, realm_id: Uuid, criteria: &UserSearchCriteria) -> StorageResult<u64>;
}

/// Search criteria for users.
#[derive(Debug, Default, Clone, Serialize)]
pub struct UserSearchCriteria {
    /// Search string (substring of username, email, first name, last name).
    pub search: Option<String>,
    /// Filter by enabled status.
    pub enabled: Option<bool>,
    /// Filter by email verified status.
    pub email_verified: Option<bool>,
    /// Include service account users.
    pub include_service_accounts: bool,
    /// Offset for pagination.
    pub first: Option<usize>,
    /// Maximum results to return.
    pub max: Option<usize>,
}

impl UserSearchCriteria {
    /// Creates a new search criteria.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            search: None,
            enabled: None,
            email_verified: None,
            include_service_accounts: false,
            first: None,
            max: None,
        }
    }

    /// Sets the search string.
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Filters by enabled status.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Filters by email verified status.
    #[must_use]
    pub const fn email_verified(mut self, verified: bool) -> Self {
        self.email_verified = Some(verified);
        self
    }

    /// Includes service account users.
    #[must_use]
    pub const fn include_service_accounts(mut self) -> Self {
        self.include_service_accounts = true;
        self
    }

    /// Sets offset and maximum results.
    #[must_use]
    pub const fn page(mut self, first: usize, max: usize) -> Self {
        self.first = Some(first);
        self.max = Some(max);
        self
    }

    /// Checks whether a user matches the filters (pagination excluded).
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        if !self.include_service_accounts && user.is_service_account() {
            return false;
        }
        if self.enabled.is_some_and(|e| e != user.enabled) {
            return false;
        }
        if self
            .email_verified
            .is_some_and(|v| v != user.email_verified)
        {
            return false;
        }
        match self.search.as_deref().map(str::to_lowercase) {
            None => true,
            Some(term) => [
                Some(user.username.as_str()),
                user.email.as_deref(),
                user.first_name.as_deref(),
                user.last_name.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_matches_any_name_field() {
        let user = User::new(Uuid::now_v7(), "jdoe")
            .with_email("john@example.com")
            .with_first_name("John");

        assert!(UserSearchCriteria::new().search("JOHN").matches(&user));
        assert!(UserSearchCriteria::new().search("example").matches(&user));
        assert!(!UserSearchCriteria::new().search("smith").matches(&user));
    }

    #[test]
    fn service_accounts_excluded_by_default() {
        let mut user = User::new(Uuid::now_v7(), "service-account-app");
        user.service_account_client_link = Some(Uuid::now_v7());

        assert!(!UserSearchCriteria::new().matches(&user));
        assert!(
            UserSearchCriteria::new()
                .include_service_accounts()
                .matches(&user)
        );
    }
}
