//! Realm provider and adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kc_model::Realm;
use kc_repository::CompositeRepository;
use kc_spi::{Dirtyable, EntityCell, Flushable, Identifiable, KeycloakSession, UndoCreate, kinds};
use kc_storage::{StorageError, StorageResult};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cascade;
use crate::client::ClientProvider;
use crate::role::RoleProvider;
use crate::user::UserProvider;

/// Request-scoped view of one realm.
#[derive(Debug)]
pub struct RealmAdapter {
    cell: EntityCell<Realm>,
    repo: Arc<CompositeRepository>,
}

impl RealmAdapter {
    fn new(realm: Realm, repo: Arc<CompositeRepository>) -> Self {
        Self {
            cell: EntityCell::loaded(kinds::REALM, realm),
            repo,
        }
    }

    fn modify(&self, f: impl FnOnce(&mut Realm)) -> StorageResult<()> {
        self.cell.update(|realm| {
            f(realm);
            realm.updated_at = Utc::now();
        })
    }

    // === Getters ===

    /// Realm ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.cell.read(|r| r.id)
    }

    /// Realm name.
    #[must_use]
    pub fn name(&self) -> String {
        self.cell.read(|r| r.name.clone())
    }

    /// Display name.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        self.cell.read(|r| r.display_name.clone())
    }

    /// Whether the realm is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cell.read(|r| r.enabled)
    }

    /// Whether several users may share one email address.
    #[must_use]
    pub fn is_duplicate_emails_allowed(&self) -> bool {
        self.cell.read(|r| r.duplicate_emails_allowed)
    }

    /// Whether events are stored.
    #[must_use]
    pub fn is_events_enabled(&self) -> bool {
        self.cell.read(|r| r.events_enabled)
    }

    /// First value of an attribute.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.cell
            .read(|r| r.get_first_attribute(name).map(str::to_string))
    }

    /// Copy of the current state.
    #[must_use]
    pub fn entity(&self) -> Realm {
        self.cell.snapshot()
    }

    // === Setters ===

    /// Renames the realm.
    ///
    /// # Errors
    ///
    /// Duplicate when another realm has the name, store failure, or invalid
    /// state when the adapter was discarded.
    pub async fn set_name(&self, name: &str) -> StorageResult<()> {
        self.cell.ensure_live()?;
        let id = self.id();
        if let Some(other) = self.repo.get_realm_by_name(name).await?
            && other.id != id
        {
            return Err(StorageError::duplicate("Realm", "name", name));
        }
        self.modify(|r| r.name = name.to_string())
    }

    /// Sets the display name.
    pub fn set_display_name(&self, name: Option<String>) -> StorageResult<()> {
        self.modify(|r| r.display_name = name)
    }

    /// Enables or disables the realm.
    pub fn set_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.modify(|r| r.enabled = enabled)
    }

    /// Allows or forbids duplicate emails.
    pub fn set_duplicate_emails_allowed(&self, allowed: bool) -> StorageResult<()> {
        self.modify(|r| r.duplicate_emails_allowed = allowed)
    }

    /// Enables or disables "remember me".
    pub fn set_remember_me(&self, remember_me: bool) -> StorageResult<()> {
        self.modify(|r| r.remember_me = remember_me)
    }

    /// Sets the authorization code lifespan.
    pub fn set_access_code_lifespan(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.access_code_lifespan = seconds)
    }

    /// Sets the user action code lifespan.
    pub fn set_access_code_lifespan_user_action(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.access_code_lifespan_user_action = seconds)
    }

    /// Sets the login code lifespan.
    pub fn set_access_code_lifespan_login(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.access_code_lifespan_login = seconds)
    }

    /// Sets the SSO session idle timeout.
    pub fn set_sso_session_idle_timeout(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.sso_session_idle_timeout = seconds)
    }

    /// Sets the SSO session max lifespan.
    pub fn set_sso_session_max_lifespan(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.sso_session_max_lifespan = seconds)
    }

    /// Sets the SSO session idle timeout for "remember me" sessions.
    pub fn set_sso_session_idle_timeout_remember_me(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.sso_session_idle_timeout_remember_me = seconds)
    }

    /// Sets the SSO session max lifespan for "remember me" sessions.
    pub fn set_sso_session_max_lifespan_remember_me(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.sso_session_max_lifespan_remember_me = seconds)
    }

    /// Sets the offline session idle timeout.
    pub fn set_offline_session_idle_timeout(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.offline_session_idle_timeout = seconds)
    }

    /// Enables or disables the offline session max lifespan.
    pub fn set_offline_session_max_lifespan_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.modify(|r| r.offline_session_max_lifespan_enabled = enabled)
    }

    /// Sets the offline session max lifespan.
    pub fn set_offline_session_max_lifespan(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.offline_session_max_lifespan = seconds)
    }

    /// Sets the client session idle timeout.
    pub fn set_client_session_idle_timeout(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.client_session_idle_timeout = seconds)
    }

    /// Sets the client session max lifespan.
    pub fn set_client_session_max_lifespan(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.client_session_max_lifespan = seconds)
    }

    /// Sets the offline client session idle timeout.
    pub fn set_client_offline_session_idle_timeout(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.client_offline_session_idle_timeout = seconds)
    }

    /// Sets the offline client session max lifespan.
    pub fn set_client_offline_session_max_lifespan(&self, seconds: i32) -> StorageResult<()> {
        self.modify(|r| r.client_offline_session_max_lifespan = seconds)
    }

    /// Enables or disables event storage.
    pub fn set_events_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.modify(|r| r.events_enabled = enabled)
    }

    /// Sets how long events are kept (seconds, 0 keeps them forever).
    pub fn set_events_expiration(&self, seconds: i64) -> StorageResult<()> {
        self.modify(|r| r.events_expiration = seconds)
    }

    /// Replaces the values of an attribute.
    pub fn set_attribute(&self, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.modify(|r| {
            r.attributes.insert(name.to_string(), values);
        })
    }

    /// Removes an attribute.
    pub fn remove_attribute(&self, name: &str) -> StorageResult<()> {
        self.modify(|r| {
            r.attributes.remove(name);
        })
    }
}

impl Identifiable for RealmAdapter {
    fn kind(&self) -> &'static str {
        kinds::REALM
    }

    fn id(&self) -> Uuid {
        Self::id(self)
    }
}

impl Dirtyable for RealmAdapter {
    fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    fn mark_dirty(&self) {
        self.cell.mark_dirty();
    }
}

#[async_trait]
impl Flushable for RealmAdapter {
    async fn flush(&self, repo: &CompositeRepository) -> StorageResult<bool> {
        let Some(write) = self.cell.pending() else {
            return Ok(false);
        };
        match &write.previous {
            Some(previous) => repo.update_realm(previous, &write.current).await?,
            None => repo.create_realm(&write.current).await?,
        }
        debug!(realm_id = %write.current.id, "realm flushed");
        self.cell.complete(write);
        Ok(true)
    }

    fn discard(&self) {
        self.cell.discard();
    }
}

/// Realm operations of one request.
#[derive(Debug, Clone)]
pub struct RealmProvider {
    session: Arc<KeycloakSession>,
}

impl RealmProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    fn wrap(&self, realm: Realm) -> Arc<RealmAdapter> {
        let registry = self.session.registry();
        if let Some(existing) = registry.get::<RealmAdapter>(kinds::REALM, realm.id) {
            return existing;
        }
        registry.register(Arc::new(RealmAdapter::new(
            realm,
            Arc::clone(self.session.repository()),
        )))
    }

    /// Creates a realm.
    ///
    /// # Errors
    ///
    /// Duplicate when the name is taken, or store failure.
    pub async fn create_realm(&self, id: Option<Uuid>, name: &str) -> StorageResult<Arc<RealmAdapter>> {
        self.session.ensure_open()?;
        let realm = Realm::with_id(id.unwrap_or_else(Uuid::now_v7), name);
        self.session.repository().create_realm(&realm).await?;
        self.session
            .register_compensation(UndoCreate::Realm(realm.clone()));
        info!(realm_id = %realm.id, name, "realm created");
        Ok(self.wrap(realm))
    }

    /// Gets a realm by ID.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_realm(&self, id: Uuid) -> StorageResult<Option<Arc<RealmAdapter>>> {
        if let Some(adapter) = self.session.registry().get::<RealmAdapter>(kinds::REALM, id) {
            return Ok(Some(adapter));
        }
        let realm = self.session.repository().get_realm(id).await?;
        Ok(realm.map(|r| self.wrap(r)))
    }

    /// Gets a realm by name.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_realm_by_name(&self, name: &str) -> StorageResult<Option<Arc<RealmAdapter>>> {
        let realm = self.session.repository().get_realm_by_name(name).await?;
        Ok(realm
            .map(|r| self.wrap(r))
            .filter(|adapter| adapter.name() == name))
    }

    /// Lists every realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_realms(&self) -> StorageResult<Vec<Arc<RealmAdapter>>> {
        let realms = self.session.repository().list_realms().await?;
        Ok(realms.into_iter().map(|r| self.wrap(r)).collect())
    }

    /// Removes a realm and everything it contains.
    ///
    /// Users (with their sessions and login failures), clients, roles,
    /// user sessions, authentication sessions and events go first, the realm
    /// row last. Returns `false` when the realm does not exist.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_realm(&self, id: Uuid) -> StorageResult<bool> {
        self.session.ensure_open()?;
        let Some(adapter) = self.get_realm(id).await? else {
            return Ok(false);
        };

        UserProvider::new(Arc::clone(&self.session))
            .remove_users(id)
            .await?;
        ClientProvider::new(Arc::clone(&self.session))
            .remove_clients(id)
            .await?;
        RoleProvider::new(Arc::clone(&self.session))
            .remove_roles(id)
            .await?;
        cascade::remove_realm_sessions(&self.session, id).await?;

        let repo = self.session.repository();
        repo.delete_login_failures_by_realm(id).await?;
        repo.delete_events_by_realm(id).await?;

        let stored = adapter.cell.persisted().unwrap_or_else(|| adapter.entity());
        let removed = repo.delete_realm(&stored).await?;
        self.session.registry().remove(kinds::REALM, id);
        info!(realm_id = %id, "realm removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn create_and_lookup_share_adapter() {
        let harness = Harness::new();
        let provider = RealmProvider::new(harness.session());

        let created = provider.create_realm(None, "acme").await.unwrap();
        let by_id = provider.get_realm(created.id()).await.unwrap().unwrap();
        let by_name = provider.get_realm_by_name("acme").await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&created, &by_id));
        assert!(Arc::ptr_eq(&created, &by_name));
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let harness = Harness::new();
        let provider = RealmProvider::new(harness.session());
        provider.create_realm(None, "acme").await.unwrap();

        let err = provider.create_realm(None, "acme").await.unwrap_err();

        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn changes_written_on_commit() {
        let harness = Harness::new();
        let session = harness.session();
        let provider = RealmProvider::new(Arc::clone(&session));
        let realm = provider.create_realm(None, "acme").await.unwrap();
        realm.set_sso_session_idle_timeout(600).unwrap();
        realm.set_name("acme-corp").await.unwrap();
        session.commit().await.unwrap();

        let provider = RealmProvider::new(harness.session());
        let loaded = provider.get_realm_by_name("acme-corp").await.unwrap().unwrap();
        assert_eq!(loaded.entity().sso_session_idle_timeout, 600);
        assert!(provider.get_realm_by_name("acme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rename_to_taken_name_rejected() {
        let harness = Harness::new();
        let provider = RealmProvider::new(harness.session());
        provider.create_realm(None, "one").await.unwrap();
        let two = provider.create_realm(None, "two").await.unwrap();

        assert!(two.set_name("one").await.unwrap_err().is_duplicate());
        assert_eq!(two.name(), "two");
    }

    #[tokio::test]
    async fn rollback_undoes_creation() {
        let harness = Harness::new();
        let session = harness.session();
        RealmProvider::new(Arc::clone(&session))
            .create_realm(None, "acme")
            .await
            .unwrap();
        session.rollback().await.unwrap();

        let provider = RealmProvider::new(harness.session());
        assert!(provider.get_realm_by_name("acme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_twice() {
        let harness = Harness::new();
        let provider = RealmProvider::new(harness.session());
        let realm = provider.create_realm(None, "acme").await.unwrap();

        assert!(provider.remove_realm(realm.id()).await.unwrap());
        assert!(!provider.remove_realm(realm.id()).await.unwrap());
        assert!(realm.set_enabled(false).unwrap_err().is_invalid_state());
    }
}
