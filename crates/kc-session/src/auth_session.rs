//! Authentication sessions.
//!
//! A root session holds one child per browser tab. The number of children
//! is capped: creating a child when the root is full evicts the oldest one
//! first. Creating or removing a child bumps the root's timestamp and
//! expiry, and removing the last child removes the root.
//!
//! Children live inside the root row, so every child change goes through
//! the root adapter and is written when the root flushes.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use kc_core::Clock;
use kc_model::{AuthenticationSession, ExecutionStatus, RootAuthenticationSession};
use kc_provider::RealmProvider;
use kc_repository::CompositeRepository;
use kc_spi::{Dirtyable, EntityCell, Flushable, Identifiable, KeycloakSession, UndoCreate, kinds};
use kc_storage::StorageResult;
use tracing::debug;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};

/// Request-scoped view of one root authentication session.
#[derive(Debug)]
pub struct RootAuthSessionAdapter {
    cell: EntityCell<RootAuthenticationSession>,
    lifespan: i64,
    limit: usize,
    clock: Clock,
    repo: Arc<CompositeRepository>,
}

impl RootAuthSessionAdapter {
    fn new(
        root: RootAuthenticationSession,
        lifespan: i64,
        limit: usize,
        clock: Clock,
        repo: Arc<CompositeRepository>,
    ) -> Self {
        Self {
            cell: EntityCell::loaded(kinds::ROOT_AUTH_SESSION, root),
            lifespan,
            limit,
            clock,
            repo,
        }
    }

    fn touch(&self, root: &mut RootAuthenticationSession, now: i64) {
        root.timestamp = now;
        root.expiration = now.saturating_add(self.lifespan);
    }

    /// Root session ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.cell.read(|r| r.id)
    }

    /// Realm ID.
    #[must_use]
    pub fn realm_id(&self) -> Uuid {
        self.cell.read(|r| r.realm_id)
    }

    /// Last change (epoch seconds).
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.cell.read(|r| r.timestamp)
    }

    /// Absolute expiry (epoch seconds).
    #[must_use]
    pub fn expiration(&self) -> i64 {
        self.cell.read(|r| r.expiration)
    }

    /// Whether the root has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiration() <= self.clock.current_time()
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cell.read(|r| r.sessions.len())
    }

    /// Whether the root has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the working copy.
    #[must_use]
    pub fn entity(&self) -> RootAuthenticationSession {
        self.cell.snapshot()
    }

    /// Sets the timestamp and moves the expiry with it.
    pub fn set_timestamp(&self, seconds: i64) -> StorageResult<()> {
        self.cell.update(|r| self.touch(r, seconds))
    }

    /// Children keyed by tab id.
    #[must_use]
    pub fn authentication_sessions(self: &Arc<Self>) -> HashMap<String, AuthSessionAdapter> {
        self.cell
            .read(|r| r.sessions.keys().cloned().collect::<Vec<_>>())
            .into_iter()
            .map(|tab_id| {
                let adapter = AuthSessionAdapter::new(Arc::clone(self), tab_id.clone());
                (tab_id, adapter)
            })
            .collect()
    }

    /// Child of `tab_id`, provided it belongs to `client_id`.
    #[must_use]
    pub fn get_authentication_session(
        self: &Arc<Self>,
        client_id: Uuid,
        tab_id: &str,
    ) -> Option<AuthSessionAdapter> {
        let matches = self.cell.read(|r| {
            r.sessions
                .get(tab_id)
                .is_some_and(|child| child.client_id == client_id)
        });
        matches.then(|| AuthSessionAdapter::new(Arc::clone(self), tab_id.to_string()))
    }

    /// Adds a child for `client_id`, evicting the oldest children while the
    /// root is full.
    pub fn create_authentication_session(
        self: &Arc<Self>,
        client_id: Uuid,
    ) -> StorageResult<AuthSessionAdapter> {
        let now = self.clock.current_time();
        let tab_id = Uuid::now_v7().simple().to_string();
        let root_id = self.id();
        self.cell.update(|r| {
            while r.sessions.len() >= self.limit {
                let Some(oldest) = r.oldest_tab_id().map(str::to_owned) else {
                    break;
                };
                r.sessions.remove(&oldest);
                debug!(%root_id, tab_id = %oldest, "authentication session evicted");
            }
            r.sessions.insert(
                tab_id.clone(),
                AuthenticationSession::new(tab_id.clone(), client_id, now),
            );
            self.touch(r, now);
        })?;
        Ok(AuthSessionAdapter::new(Arc::clone(self), tab_id))
    }

    /// Removes the child of `tab_id`. The root itself is deleted once its
    /// last child is gone. Returns whether the child existed.
    ///
    /// # Errors
    ///
    /// Invalid state when the root was discarded, or store failure.
    pub async fn remove_authentication_session_by_tab_id(
        &self,
        tab_id: &str,
    ) -> SessionResult<bool> {
        let now = self.clock.current_time();
        let (removed, empty) = self.cell.update(|r| {
            let removed = r.sessions.remove(tab_id).is_some();
            if removed {
                self.touch(r, now);
            }
            (removed, r.sessions.is_empty())
        })?;
        if removed && empty {
            let (realm_id, id) = self.cell.read(|r| (r.realm_id, r.id));
            self.cell.discard();
            self.repo.delete_root_auth_session(realm_id, id).await?;
            debug!(root_id = %id, "empty root authentication session removed");
        }
        Ok(removed)
    }

    /// Drops every child and bumps the timestamp.
    pub fn restart_session(&self) -> StorageResult<()> {
        let now = self.clock.current_time();
        self.cell.update(|r| {
            r.sessions.clear();
            self.touch(r, now);
        })
    }

    fn read_child<R>(&self, tab_id: &str, f: impl FnOnce(&AuthenticationSession) -> R) -> Option<R> {
        self.cell.read(|r| r.sessions.get(tab_id).map(f))
    }

    fn modify_child(
        &self,
        tab_id: &str,
        f: impl FnOnce(&mut AuthenticationSession),
    ) -> SessionResult<()> {
        if self.cell.update(|r| r.sessions.get_mut(tab_id).map(f).is_some())? {
            Ok(())
        } else {
            Err(SessionError::AuthSessionNotFound(tab_id.to_string()))
        }
    }
}

impl Identifiable for RootAuthSessionAdapter {
    fn kind(&self) -> &'static str {
        kinds::ROOT_AUTH_SESSION
    }

    fn id(&self) -> Uuid {
        self.cell.read(|r| r.id)
    }
}

impl Dirtyable for RootAuthSessionAdapter {
    fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    fn mark_dirty(&self) {
        self.cell.mark_dirty();
    }
}

#[async_trait]
impl Flushable for RootAuthSessionAdapter {
    async fn flush(&self, repo: &CompositeRepository) -> StorageResult<bool> {
        let Some(write) = self.cell.pending() else {
            return Ok(false);
        };
        let ttl = (write.current.expiration - self.clock.current_time()).max(1);
        repo.upsert_root_auth_session(&write.current, Some(ttl))
            .await?;
        debug!(root_id = %write.current.id, children = write.current.sessions.len(), "root authentication session flushed");
        self.cell.complete(write);
        Ok(true)
    }

    fn discard(&self) {
        self.cell.discard();
    }
}

/// One browser tab's authentication session inside a
/// [`RootAuthSessionAdapter`].
///
/// Reads return `None` or empty values once the child was evicted or
/// removed; writes fail with [`SessionError::AuthSessionNotFound`].
#[derive(Debug, Clone)]
pub struct AuthSessionAdapter {
    root: Arc<RootAuthSessionAdapter>,
    tab_id: String,
}

impl AuthSessionAdapter {
    const fn new(root: Arc<RootAuthSessionAdapter>, tab_id: String) -> Self {
        Self { root, tab_id }
    }

    fn read<R>(&self, f: impl FnOnce(&AuthenticationSession) -> R) -> Option<R> {
        self.root.read_child(&self.tab_id, f)
    }

    fn modify(&self, f: impl FnOnce(&mut AuthenticationSession)) -> SessionResult<()> {
        self.root.modify_child(&self.tab_id, f)
    }

    // === Getters ===

    /// Tab ID.
    #[must_use]
    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    /// Owning root session.
    #[must_use]
    pub const fn parent_session(&self) -> &Arc<RootAuthSessionAdapter> {
        &self.root
    }

    /// Whether the child still exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.read(|_| ()).is_some()
    }

    /// Clones the child.
    #[must_use]
    pub fn entity(&self) -> Option<AuthenticationSession> {
        self.read(AuthenticationSession::clone)
    }

    /// Client that started the authentication.
    #[must_use]
    pub fn client_id(&self) -> Option<Uuid> {
        self.read(|s| s.client_id)
    }

    /// Creation or last restart (epoch seconds).
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        self.read(|s| s.timestamp)
    }

    /// Current action.
    #[must_use]
    pub fn action(&self) -> Option<String> {
        self.read(|s| s.action.clone()).flatten()
    }

    /// Protocol.
    #[must_use]
    pub fn protocol(&self) -> Option<String> {
        self.read(|s| s.protocol.clone()).flatten()
    }

    /// Redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<String> {
        self.read(|s| s.redirect_uri.clone()).flatten()
    }

    /// Status of one authenticator.
    #[must_use]
    pub fn execution_status(&self, authenticator: &str) -> Option<ExecutionStatus> {
        self.read(|s| s.execution_status.get(authenticator).copied())
            .flatten()
    }

    /// Status of every authenticator.
    #[must_use]
    pub fn executions(&self) -> HashMap<String, ExecutionStatus> {
        self.read(|s| s.execution_status.clone())
            .unwrap_or_default()
    }

    /// User identified so far.
    #[must_use]
    pub fn authenticated_user_id(&self) -> Option<Uuid> {
        self.read(|s| s.authenticated_user_id).flatten()
    }

    /// Required actions.
    #[must_use]
    pub fn required_actions(&self) -> BTreeSet<String> {
        self.read(|s| s.required_actions.clone())
            .unwrap_or_default()
    }

    /// Requested client scopes.
    #[must_use]
    pub fn client_scopes(&self) -> BTreeSet<String> {
        self.read(|s| s.client_scopes.clone()).unwrap_or_default()
    }

    /// Gets an auth note.
    #[must_use]
    pub fn auth_note(&self, key: &str) -> Option<String> {
        self.read(|s| s.auth_notes.get(key).cloned()).flatten()
    }

    /// Gets a client note.
    #[must_use]
    pub fn client_note(&self, key: &str) -> Option<String> {
        self.read(|s| s.client_notes.get(key).cloned()).flatten()
    }

    /// All client notes.
    #[must_use]
    pub fn client_notes(&self) -> HashMap<String, String> {
        self.read(|s| s.client_notes.clone()).unwrap_or_default()
    }

    /// All user session notes.
    #[must_use]
    pub fn user_session_notes(&self) -> HashMap<String, String> {
        self.read(|s| s.user_session_notes.clone())
            .unwrap_or_default()
    }

    // === Setters ===

    /// Sets the timestamp.
    pub fn set_timestamp(&self, seconds: i64) -> SessionResult<()> {
        self.modify(|s| s.timestamp = seconds)
    }

    /// Sets the current action.
    pub fn set_action(&self, action: Option<String>) -> SessionResult<()> {
        self.modify(|s| s.action = action)
    }

    /// Sets the protocol.
    pub fn set_protocol(&self, protocol: impl Into<String>) -> SessionResult<()> {
        let protocol = protocol.into();
        self.modify(|s| s.protocol = Some(protocol))
    }

    /// Sets the redirect URI.
    pub fn set_redirect_uri(&self, uri: impl Into<String>) -> SessionResult<()> {
        let uri = uri.into();
        self.modify(|s| s.redirect_uri = Some(uri))
    }

    /// Records the status of one authenticator.
    pub fn set_execution_status(
        &self,
        authenticator: impl Into<String>,
        status: ExecutionStatus,
    ) -> SessionResult<()> {
        let authenticator = authenticator.into();
        self.modify(|s| {
            s.execution_status.insert(authenticator, status);
        })
    }

    /// Forgets every authenticator status.
    pub fn clear_execution_status(&self) -> SessionResult<()> {
        self.modify(|s| s.execution_status.clear())
    }

    /// Sets the identified user.
    pub fn set_authenticated_user(&self, user_id: Option<Uuid>) -> SessionResult<()> {
        self.modify(|s| s.authenticated_user_id = user_id)
    }

    /// Adds a required action.
    pub fn add_required_action(&self, action: impl Into<String>) -> SessionResult<()> {
        let action = action.into();
        self.modify(|s| {
            s.required_actions.insert(action);
        })
    }

    /// Removes a required action.
    pub fn remove_required_action(&self, action: &str) -> SessionResult<()> {
        self.modify(|s| {
            s.required_actions.remove(action);
        })
    }

    /// Replaces the requested client scopes.
    pub fn set_client_scopes(&self, scopes: BTreeSet<String>) -> SessionResult<()> {
        self.modify(|s| s.client_scopes = scopes)
    }

    /// Sets an auth note.
    pub fn set_auth_note(&self, key: impl Into<String>, value: impl Into<String>) -> SessionResult<()> {
        let (key, value) = (key.into(), value.into());
        self.modify(|s| {
            s.auth_notes.insert(key, value);
        })
    }

    /// Removes an auth note.
    pub fn remove_auth_note(&self, key: &str) -> SessionResult<()> {
        self.modify(|s| {
            s.auth_notes.remove(key);
        })
    }

    /// Removes every auth note.
    pub fn clear_auth_notes(&self) -> SessionResult<()> {
        self.modify(|s| s.auth_notes.clear())
    }

    /// Sets a client note.
    pub fn set_client_note(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> SessionResult<()> {
        let (key, value) = (key.into(), value.into());
        self.modify(|s| {
            s.client_notes.insert(key, value);
        })
    }

    /// Removes a client note.
    pub fn remove_client_note(&self, key: &str) -> SessionResult<()> {
        self.modify(|s| {
            s.client_notes.remove(key);
        })
    }

    /// Removes every client note.
    pub fn clear_client_notes(&self) -> SessionResult<()> {
        self.modify(|s| s.client_notes.clear())
    }

    /// Sets a note copied into the user session on success.
    pub fn set_user_session_note(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> SessionResult<()> {
        let (key, value) = (key.into(), value.into());
        self.modify(|s| {
            s.user_session_notes.insert(key, value);
        })
    }

    /// Removes every user session note.
    pub fn clear_user_session_notes(&self) -> SessionResult<()> {
        self.modify(|s| s.user_session_notes.clear())
    }

    /// Clears all progress, keeping tab and client.
    pub fn restart(&self) -> SessionResult<()> {
        let now = self.root.clock.current_time();
        self.modify(|s| s.restart(now))
    }
}

/// Authentication session operations of one request.
#[derive(Debug, Clone)]
pub struct AuthenticationSessionProvider {
    session: Arc<KeycloakSession>,
}

impl AuthenticationSessionProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    async fn lifespan(&self, realm_id: Uuid) -> SessionResult<Option<i64>> {
        let realm = RealmProvider::new(Arc::clone(&self.session))
            .get_realm(realm_id)
            .await?;
        Ok(realm.map(|r| i64::from(r.entity().auth_session_lifespan())))
    }

    fn registered(&self, id: Uuid) -> Option<Arc<RootAuthSessionAdapter>> {
        self.session
            .registry()
            .get::<RootAuthSessionAdapter>(kinds::ROOT_AUTH_SESSION, id)
    }

    /// Registered adapter for `root`, or a new one. An adapter discarded
    /// when its last child went away is replaced.
    fn wrap(&self, root: RootAuthenticationSession, lifespan: i64) -> Arc<RootAuthSessionAdapter> {
        let registry = self.session.registry();
        if let Some(existing) = self.registered(root.id) {
            if !existing.cell.is_discarded() {
                return existing;
            }
            registry.remove(kinds::ROOT_AUTH_SESSION, root.id);
        }
        registry.register(Arc::new(RootAuthSessionAdapter::new(
            root,
            lifespan,
            self.session.config().auth_sessions_limit,
            self.session.clock().clone(),
            Arc::clone(self.session.repository()),
        )))
    }

    /// Creates an empty root session, written immediately.
    ///
    /// # Errors
    ///
    /// Invalid state when the realm does not exist, or store failure.
    pub async fn create_root_authentication_session(
        &self,
        realm_id: Uuid,
        id: Option<Uuid>,
    ) -> SessionResult<Arc<RootAuthSessionAdapter>> {
        self.session.ensure_open()?;
        let lifespan = self
            .lifespan(realm_id)
            .await?
            .ok_or(SessionError::RealmNotFound(realm_id))?;
        let now = self.session.clock().current_time();
        let id = id.unwrap_or_else(Uuid::now_v7);
        let mut root = RootAuthenticationSession::new(id, realm_id, now);
        root.expiration = now.saturating_add(lifespan);

        self.session
            .repository()
            .upsert_root_auth_session(&root, Some(lifespan.max(1)))
            .await?;
        self.session
            .register_compensation(UndoCreate::RootAuthSession { realm_id, id });
        debug!(root_id = %id, %realm_id, "root authentication session created");
        Ok(self.wrap(root, lifespan))
    }

    /// Gets a root session. Expired roots are deleted and reported absent.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_root_authentication_session(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> SessionResult<Option<Arc<RootAuthSessionAdapter>>> {
        if let Some(adapter) = self.registered(id) {
            if adapter.cell.is_discarded() || adapter.realm_id() != realm_id {
                return Ok(None);
            }
            if adapter.is_expired() {
                self.remove_root_authentication_session(realm_id, id).await?;
                return Ok(None);
            }
            return Ok(Some(adapter));
        }

        let repo = self.session.repository();
        let Some(root) = repo.get_root_auth_session(realm_id, id).await? else {
            return Ok(None);
        };
        if root.expiration <= self.session.clock().current_time() {
            debug!(root_id = %id, "root authentication session expired");
            repo.delete_root_auth_session(realm_id, id).await?;
            return Ok(None);
        }
        let Some(lifespan) = self.lifespan(realm_id).await? else {
            return Ok(None);
        };
        Ok(Some(self.wrap(root, lifespan)))
    }

    /// Removes a root session and its children. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_root_authentication_session(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> SessionResult<bool> {
        self.session.ensure_open()?;
        self.session
            .registry()
            .remove(kinds::ROOT_AUTH_SESSION, id);
        Ok(self
            .session
            .repository()
            .delete_root_auth_session(realm_id, id)
            .await?)
    }

    /// Expired roots are deleted when read and dropped by the store TTL, so
    /// there is nothing to sweep.
    pub fn remove_all_expired(&self) {
        debug!(session = %self.session.id(), "expired authentication sessions are removed lazily");
    }

    /// Removes every root session of a removed realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn on_realm_removed(&self, realm_id: Uuid) -> SessionResult<()> {
        self.session.ensure_open()?;
        let registry = self.session.registry();
        let registered: Vec<Uuid> = registry
            .adapters()
            .into_iter()
            .filter(|adapter| adapter.kind() == kinds::ROOT_AUTH_SESSION)
            .filter_map(|adapter| self.registered(adapter.id()))
            .filter(|root| root.realm_id() == realm_id)
            .map(|root| root.id())
            .collect();
        for id in registered {
            registry.remove(kinds::ROOT_AUTH_SESSION, id);
        }
        Ok(self
            .session
            .repository()
            .delete_root_auth_sessions_by_realm(realm_id)
            .await?)
    }

    /// Removes the children started by a removed client, and roots left
    /// without children.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn on_client_removed(&self, realm_id: Uuid, client_id: Uuid) -> SessionResult<()> {
        self.session.ensure_open()?;
        let roots = self
            .session
            .repository()
            .find_root_auth_sessions_by_realm(realm_id)
            .await?;
        for stored in roots {
            if !stored.sessions.values().any(|s| s.client_id == client_id) {
                continue;
            }
            let Some(root) = self
                .get_root_authentication_session(realm_id, stored.id)
                .await?
            else {
                continue;
            };
            let tabs: Vec<String> = root
                .entity()
                .sessions
                .values()
                .filter(|s| s.client_id == client_id)
                .map(|s| s.tab_id.clone())
                .collect();
            for tab_id in tabs {
                root.remove_authentication_session_by_tab_id(&tab_id)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kc_core::Config;

    use super::*;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn full_root_evicts_oldest() {
        let harness = Harness::new();
        let session = harness.session_with(Config::new().auth_sessions_limit(2));
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = AuthenticationSessionProvider::new(Arc::clone(&session));
        let root = provider
            .create_root_authentication_session(realm_id, None)
            .await
            .unwrap();

        let first = root.create_authentication_session(client_id).unwrap();
        harness.clock.advance(1);
        let second = root.create_authentication_session(client_id).unwrap();
        harness.clock.advance(1);
        let third = root.create_authentication_session(client_id).unwrap();

        assert_eq!(root.len(), 2);
        assert!(!first.exists());
        assert!(second.exists());
        assert!(third.exists());
        assert!(first.set_action(Some("AUTHENTICATE".to_string())).is_err());
    }

    #[tokio::test]
    async fn child_creation_bumps_root() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = AuthenticationSessionProvider::new(Arc::clone(&session));
        let root = provider
            .create_root_authentication_session(realm_id, None)
            .await
            .unwrap();
        let created_at = root.timestamp();

        harness.clock.advance(100);
        root.create_authentication_session(client_id).unwrap();

        assert_eq!(root.timestamp(), created_at + 100);
        assert_eq!(root.expiration(), root.timestamp() + 1_800);
    }

    #[tokio::test]
    async fn children_written_with_root() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = AuthenticationSessionProvider::new(Arc::clone(&session));
        let root = provider
            .create_root_authentication_session(realm_id, None)
            .await
            .unwrap();
        let child = root.create_authentication_session(client_id).unwrap();
        child.set_auth_note("attempts", "1").unwrap();
        child
            .set_execution_status("auth-password-form", ExecutionStatus::Challenged)
            .unwrap();
        let tab_id = child.tab_id().to_string();
        let root_id = root.id();
        session.commit().await.unwrap();

        let provider = AuthenticationSessionProvider::new(harness.session());
        let root = provider
            .get_root_authentication_session(realm_id, root_id)
            .await
            .unwrap()
            .unwrap();
        let child = root
            .get_authentication_session(client_id, &tab_id)
            .unwrap();
        assert_eq!(child.auth_note("attempts").as_deref(), Some("1"));
        assert_eq!(
            child.execution_status("auth-password-form"),
            Some(ExecutionStatus::Challenged)
        );
        assert!(
            root.get_authentication_session(Uuid::now_v7(), &tab_id)
                .is_none()
        );
    }

    #[tokio::test]
    async fn removing_last_child_removes_root() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = AuthenticationSessionProvider::new(Arc::clone(&session));
        let root = provider
            .create_root_authentication_session(realm_id, None)
            .await
            .unwrap();
        let child = root.create_authentication_session(client_id).unwrap();

        assert!(
            root.remove_authentication_session_by_tab_id(child.tab_id())
                .await
                .unwrap()
        );

        assert!(
            provider
                .get_root_authentication_session(realm_id, root.id())
                .await
                .unwrap()
                .is_none()
        );
        session.commit().await.unwrap();
        let provider = AuthenticationSessionProvider::new(harness.session());
        assert!(
            provider
                .get_root_authentication_session(realm_id, root.id())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn root_id_reusable_after_last_child_removed() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = AuthenticationSessionProvider::new(Arc::clone(&session));
        let id = Uuid::now_v7();
        let old = provider
            .create_root_authentication_session(realm_id, Some(id))
            .await
            .unwrap();
        let child = old.create_authentication_session(client_id).unwrap();
        old.remove_authentication_session_by_tab_id(child.tab_id())
            .await
            .unwrap();

        let new = provider
            .create_root_authentication_session(realm_id, Some(id))
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&old, &new));
        let tab = new.create_authentication_session(client_id).unwrap();
        let found = provider
            .get_root_authentication_session(realm_id, id)
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&found, &new));
        session.commit().await.unwrap();

        let root = AuthenticationSessionProvider::new(harness.session())
            .get_root_authentication_session(realm_id, id)
            .await
            .unwrap()
            .unwrap();
        assert!(
            root.get_authentication_session(client_id, tab.tab_id())
                .is_some()
        );
    }

    #[tokio::test]
    async fn expired_root_is_absent() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let root = AuthenticationSessionProvider::new(Arc::clone(&session))
            .create_root_authentication_session(realm_id, None)
            .await
            .unwrap();
        let id = root.id();
        session.commit().await.unwrap();

        harness.clock.advance(1_801);

        let provider = AuthenticationSessionProvider::new(harness.session());
        assert!(
            provider
                .get_root_authentication_session(realm_id, id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn client_removal_drops_its_tabs() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = AuthenticationSessionProvider::new(Arc::clone(&session));
        let root = provider
            .create_root_authentication_session(realm_id, None)
            .await
            .unwrap();
        root.create_authentication_session(client_id).unwrap();
        let other = Uuid::now_v7();
        let kept = root.create_authentication_session(other).unwrap();
        let root_id = root.id();
        session.commit().await.unwrap();

        let session = harness.session();
        AuthenticationSessionProvider::new(Arc::clone(&session))
            .on_client_removed(realm_id, client_id)
            .await
            .unwrap();
        session.commit().await.unwrap();

        let root = AuthenticationSessionProvider::new(harness.session())
            .get_root_authentication_session(realm_id, root_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(root.len(), 1);
        assert!(
            root.get_authentication_session(other, kept.tab_id())
                .is_some()
        );
    }

    #[tokio::test]
    async fn restart_clears_children() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let root = AuthenticationSessionProvider::new(Arc::clone(&session))
            .create_root_authentication_session(realm_id, None)
            .await
            .unwrap();
        root.create_authentication_session(client_id).unwrap();

        root.restart_session().unwrap();

        assert!(root.is_empty());
        assert!(root.authentication_sessions().is_empty());
    }
}
