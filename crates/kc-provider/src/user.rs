//! User provider and adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kc_model::User;
use kc_repository::CompositeRepository;
use kc_spi::{Dirtyable, EntityCell, Flushable, Identifiable, KeycloakSession, UndoCreate, kinds};
use kc_storage::{StorageError, StorageResult, UserSearchCriteria};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cascade;

/// Request-scoped view of one user.
#[derive(Debug)]
pub struct UserAdapter {
    cell: EntityCell<User>,
    repo: Arc<CompositeRepository>,
}

impl UserAdapter {
    fn new(user: User, repo: Arc<CompositeRepository>) -> Self {
        Self {
            cell: EntityCell::loaded(kinds::USER, user),
            repo,
        }
    }

    fn modify(&self, f: impl FnOnce(&mut User)) -> StorageResult<()> {
        self.cell.update(|user| {
            f(user);
            user.updated_at = Utc::now();
        })
    }

    // === Getters ===

    /// User ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.cell.read(|u| u.id)
    }

    /// Realm ID.
    #[must_use]
    pub fn realm_id(&self) -> Uuid {
        self.cell.read(|u| u.realm_id)
    }

    /// Username, lower-cased.
    #[must_use]
    pub fn username(&self) -> String {
        self.cell.read(|u| u.username.clone())
    }

    /// Email, lower-cased.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        self.cell.read(|u| u.email.clone())
    }

    /// Whether the account is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cell.read(|u| u.enabled)
    }

    /// Whether the email was verified.
    #[must_use]
    pub fn is_email_verified(&self) -> bool {
        self.cell.read(|u| u.email_verified)
    }

    /// First value of an attribute.
    #[must_use]
    pub fn get_first_attribute(&self, name: &str) -> Option<String> {
        self.cell
            .read(|u| u.get_first_attribute(name).map(str::to_string))
    }

    /// Every value of an attribute.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Vec<String> {
        self.cell
            .read(|u| u.attributes.get(name).cloned().unwrap_or_default())
    }

    /// Whether a role is granted directly.
    #[must_use]
    pub fn has_direct_role(&self, role_id: Uuid) -> bool {
        self.cell.read(|u| u.role_mappings.contains(&role_id))
    }

    /// Copy of the current state.
    #[must_use]
    pub fn entity(&self) -> User {
        self.cell.snapshot()
    }

    // === Setters ===

    /// Changes the username. The value is lower-cased.
    ///
    /// # Errors
    ///
    /// Duplicate when another user of the realm has the name, store failure,
    /// or invalid state when the adapter was discarded.
    pub async fn set_username(&self, username: &str) -> StorageResult<()> {
        self.cell.ensure_live()?;
        let username = username.to_lowercase();
        let (realm_id, id) = self.cell.read(|u| (u.realm_id, u.id));
        if let Some(other) = self.repo.get_user_by_username(realm_id, &username).await?
            && other.id != id
        {
            return Err(StorageError::duplicate("User", "username", username));
        }
        self.modify(|u| u.username = username)
    }

    /// Changes the email. The value is lower-cased.
    ///
    /// # Errors
    ///
    /// Duplicate when another user has the address and the realm does not
    /// allow duplicate emails, store failure, or invalid state.
    pub async fn set_email(&self, email: Option<&str>) -> StorageResult<()> {
        self.cell.ensure_live()?;
        let email = email.map(str::to_lowercase);
        if let Some(address) = &email {
            let (realm_id, id) = self.cell.read(|u| (u.realm_id, u.id));
            let duplicates_allowed = self
                .repo
                .get_realm(realm_id)
                .await?
                .is_some_and(|realm| realm.duplicate_emails_allowed);
            if !duplicates_allowed
                && self
                    .repo
                    .get_users_by_email(realm_id, address)
                    .await?
                    .iter()
                    .any(|other| other.id != id)
            {
                return Err(StorageError::duplicate("User", "email", address.clone()));
            }
        }
        self.modify(|u| u.email = email)
    }

    /// Sets the first name.
    pub fn set_first_name(&self, name: Option<String>) -> StorageResult<()> {
        self.modify(|u| u.first_name = name)
    }

    /// Sets the last name.
    pub fn set_last_name(&self, name: Option<String>) -> StorageResult<()> {
        self.modify(|u| u.last_name = name)
    }

    /// Enables or disables the account.
    pub fn set_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.modify(|u| u.enabled = enabled)
    }

    /// Marks the email verified or not.
    pub fn set_email_verified(&self, verified: bool) -> StorageResult<()> {
        self.modify(|u| u.email_verified = verified)
    }

    /// Links the user to a federation provider.
    pub fn set_federation_link(&self, link: Option<String>) -> StorageResult<()> {
        self.modify(|u| u.federation_link = link)
    }

    /// Makes the user the service account of a client.
    pub fn set_service_account_client_link(&self, client_id: Option<Uuid>) -> StorageResult<()> {
        self.modify(|u| u.service_account_client_link = client_id)
    }

    /// Sets a single-valued attribute.
    pub fn set_single_attribute(&self, name: &str, value: impl Into<String>) -> StorageResult<()> {
        let value = value.into();
        self.modify(|u| {
            u.attributes.insert(name.to_string(), vec![value]);
        })
    }

    /// Replaces the values of an attribute.
    pub fn set_attribute(&self, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.modify(|u| {
            u.attributes.insert(name.to_string(), values);
        })
    }

    /// Removes an attribute.
    pub fn remove_attribute(&self, name: &str) -> StorageResult<()> {
        self.modify(|u| {
            u.attributes.remove(name);
        })
    }

    /// Adds a required action unless already present.
    pub fn add_required_action(&self, action: &str) -> StorageResult<()> {
        self.modify(|u| {
            if !u.has_required_action(action) {
                u.required_actions.push(action.to_string());
            }
        })
    }

    /// Removes a required action.
    pub fn remove_required_action(&self, action: &str) -> StorageResult<()> {
        self.modify(|u| u.required_actions.retain(|a| a != action))
    }

    /// Grants a role.
    pub fn grant_role(&self, role_id: Uuid) -> StorageResult<()> {
        self.modify(|u| {
            if !u.role_mappings.contains(&role_id) {
                u.role_mappings.push(role_id);
            }
        })
    }

    /// Revokes a directly granted role.
    pub fn delete_role_mapping(&self, role_id: Uuid) -> StorageResult<()> {
        self.modify(|u| u.role_mappings.retain(|r| *r != role_id))
    }

    /// Sets the token not-before timestamp.
    pub fn set_not_before(&self, not_before: i64) -> StorageResult<()> {
        self.modify(|u| u.not_before = not_before)
    }
}

impl Identifiable for UserAdapter {
    fn kind(&self) -> &'static str {
        kinds::USER
    }

    fn id(&self) -> Uuid {
        Self::id(self)
    }
}

impl Dirtyable for UserAdapter {
    fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    fn mark_dirty(&self) {
        self.cell.mark_dirty();
    }
}

#[async_trait]
impl Flushable for UserAdapter {
    async fn flush(&self, repo: &CompositeRepository) -> StorageResult<bool> {
        let Some(write) = self.cell.pending() else {
            return Ok(false);
        };
        match &write.previous {
            Some(previous) => repo.update_user(previous, &write.current).await?,
            None => repo.create_user(&write.current).await?,
        }
        debug!(user_id = %write.current.id, "user flushed");
        self.cell.complete(write);
        Ok(true)
    }

    fn discard(&self) {
        self.cell.discard();
    }
}

/// User operations of one request.
#[derive(Debug, Clone)]
pub struct UserProvider {
    session: Arc<KeycloakSession>,
}

impl UserProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    fn wrap(&self, user: User) -> Arc<UserAdapter> {
        let registry = self.session.registry();
        if let Some(existing) = registry.get::<UserAdapter>(kinds::USER, user.id) {
            return existing;
        }
        registry.register(Arc::new(UserAdapter::new(
            user,
            Arc::clone(self.session.repository()),
        )))
    }

    fn wrap_all(&self, users: Vec<User>) -> Vec<Arc<UserAdapter>> {
        users.into_iter().map(|u| self.wrap(u)).collect()
    }

    /// Adds a user. The username is lower-cased.
    ///
    /// # Errors
    ///
    /// Duplicate when the username is taken, or store failure.
    pub async fn add_user(
        &self,
        realm_id: Uuid,
        id: Option<Uuid>,
        username: &str,
    ) -> StorageResult<Arc<UserAdapter>> {
        self.session.ensure_open()?;
        let user = User::with_id(
            id.unwrap_or_else(Uuid::now_v7),
            realm_id,
            username.to_lowercase(),
        );
        self.session.repository().create_user(&user).await?;
        self.session
            .register_compensation(UndoCreate::User(user.clone()));
        debug!(%realm_id, user_id = %user.id, "user added");
        Ok(self.wrap(user))
    }

    /// Gets a user by ID.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_by_id(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<Arc<UserAdapter>>> {
        if let Some(adapter) = self.session.registry().get::<UserAdapter>(kinds::USER, id) {
            return Ok((adapter.realm_id() == realm_id).then_some(adapter));
        }
        let user = self.session.repository().get_user(realm_id, id).await?;
        Ok(user.map(|u| self.wrap(u)))
    }

    /// Gets a user by username, case-insensitively.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_by_username(
        &self,
        realm_id: Uuid,
        username: &str,
    ) -> StorageResult<Option<Arc<UserAdapter>>> {
        let username = username.to_lowercase();
        let user = self
            .session
            .repository()
            .get_user_by_username(realm_id, &username)
            .await?;
        Ok(user
            .map(|u| self.wrap(u))
            .filter(|adapter| adapter.username() == username))
    }

    /// Gets the user with an email address.
    ///
    /// Returns `None` when several users share the address and the realm
    /// allows that.
    ///
    /// # Errors
    ///
    /// Duplicate when several users share the address although the realm
    /// forbids it, or store failure.
    pub async fn get_user_by_email(
        &self,
        realm_id: Uuid,
        email: &str,
    ) -> StorageResult<Option<Arc<UserAdapter>>> {
        let email = email.to_lowercase();
        let repo = self.session.repository();
        let mut users = repo.get_users_by_email(realm_id, &email).await?;
        match users.len() {
            0 => Ok(None),
            1 => Ok(users
                .pop()
                .map(|u| self.wrap(u))
                .filter(|adapter| adapter.email().as_deref() == Some(email.as_str()))),
            _ => {
                let allowed = repo
                    .get_realm(realm_id)
                    .await?
                    .is_some_and(|realm| realm.duplicate_emails_allowed);
                if allowed {
                    Ok(None)
                } else {
                    Err(StorageError::duplicate("User", "email", email))
                }
            }
        }
    }

    /// Gets the service account of a client.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_service_account(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
    ) -> StorageResult<Option<Arc<UserAdapter>>> {
        let user = self
            .session
            .repository()
            .get_service_account_user(realm_id, client_id)
            .await?;
        Ok(user.map(|u| self.wrap(u)))
    }

    /// Gets the users linked to a federation provider.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_users_by_federation_link(
        &self,
        realm_id: Uuid,
        link: &str,
    ) -> StorageResult<Vec<Arc<UserAdapter>>> {
        let users = self
            .session
            .repository()
            .get_users_by_federation_link(realm_id, link)
            .await?;
        Ok(self.wrap_all(users))
    }

    /// Gets the users having an attribute value.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn search_for_user_by_attribute(
        &self,
        realm_id: Uuid,
        name: &str,
        value: &str,
    ) -> StorageResult<Vec<Arc<UserAdapter>>> {
        let users = self
            .session
            .repository()
            .get_users_by_attribute(realm_id, name, value)
            .await?;
        Ok(self.wrap_all(users))
    }

    /// Searches users.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn search(
        &self,
        realm_id: Uuid,
        criteria: &UserSearchCriteria,
    ) -> StorageResult<Vec<Arc<UserAdapter>>> {
        let users = self
            .session
            .repository()
            .search_users(realm_id, criteria)
            .await?;
        Ok(self.wrap_all(users))
    }

    /// Counts users matching criteria.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn count(&self, realm_id: Uuid, criteria: &UserSearchCriteria) -> StorageResult<u64> {
        self.session
            .repository()
            .count_users(realm_id, criteria)
            .await
    }

    /// Removes a user with its sessions and login failure record.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_user(&self, realm_id: Uuid, id: Uuid) -> StorageResult<bool> {
        self.session.ensure_open()?;
        let Some(adapter) = self.get_user_by_id(realm_id, id).await? else {
            return Ok(false);
        };
        self.remove_adapter(&adapter).await
    }

    async fn remove_adapter(&self, adapter: &UserAdapter) -> StorageResult<bool> {
        let (realm_id, id) = (adapter.realm_id(), adapter.id());
        cascade::remove_user_sessions(&self.session, realm_id, id).await?;

        let repo = self.session.repository();
        self.session.registry().remove(kinds::LOGIN_FAILURE, id);
        repo.delete_login_failure(realm_id, id).await?;

        let stored = adapter.cell.persisted().unwrap_or_else(|| adapter.entity());
        let removed = repo.delete_user(&stored).await?;
        self.session.registry().remove(kinds::USER, id);
        debug!(%realm_id, user_id = %id, "user removed");
        Ok(removed)
    }

    /// Removes every user of a realm, service accounts included.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_users(&self, realm_id: Uuid) -> StorageResult<()> {
        let criteria = UserSearchCriteria::new().include_service_accounts();
        let users = self.search(realm_id, &criteria).await?;
        let count = users.len();
        for user in users {
            self.remove_adapter(&user).await?;
        }
        info!(%realm_id, count, "realm users removed");
        Ok(())
    }
}
