//! User session provider.
//!
//! Every lookup evaluates expiry first: an expired session is deleted on
//! the spot and reported as absent. Nothing sweeps expired sessions in the
//! background; the store TTL drops what nobody reads.

use std::collections::HashMap;
use std::sync::Arc;

use kc_model::{AuthenticatedClientSession, UserSession};
use kc_provider::{ClientProvider, RealmProvider};
use kc_spi::{Flushable, KeycloakSession, UndoCreate, kinds};
use tracing::debug;
use uuid::Uuid;

use crate::client_session::ClientSessionAdapter;
use crate::error::{SessionError, SessionResult};
use crate::expiration::{self, ClientExpiration, RealmExpiration};
use crate::user_session::{SessionOptions, UserSessionAdapter};

/// User and client session operations of one request.
#[derive(Debug, Clone)]
pub struct UserSessionProvider {
    session: Arc<KeycloakSession>,
}

impl UserSessionProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    fn now(&self) -> i64 {
        self.session.clock().current_time()
    }

    async fn realm_expiration(&self, realm_id: Uuid) -> SessionResult<Option<RealmExpiration>> {
        let realm = RealmProvider::new(Arc::clone(&self.session))
            .get_realm(realm_id)
            .await?;
        Ok(realm.map(|r| RealmExpiration::from(&r.entity())))
    }

    async fn client_expiration(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
    ) -> SessionResult<ClientExpiration> {
        let client = ClientProvider::new(Arc::clone(&self.session))
            .get_client_by_id(realm_id, client_id)
            .await?
            .ok_or(SessionError::ClientNotFound(client_id))?;
        Ok(ClientExpiration::from(&client.entity()))
    }

    fn registered(&self, id: Uuid) -> Option<Arc<UserSessionAdapter>> {
        self.session
            .registry()
            .get::<UserSessionAdapter>(kinds::USER_SESSION, id)
    }

    fn wrap(&self, session: UserSession, realm: RealmExpiration) -> Arc<UserSessionAdapter> {
        if let Some(existing) = self.registered(session.id) {
            return existing;
        }
        self.session.registry().register(Arc::new(UserSessionAdapter::new(
            session,
            realm,
            self.session.clock().clone(),
            Arc::clone(self.session.repository()),
        )))
    }

    async fn delete(&self, adapter: &UserSessionAdapter) -> SessionResult<bool> {
        let stored = adapter.stored();
        self.session
            .registry()
            .remove(kinds::USER_SESSION, stored.id);
        if stored.is_transient() {
            return Ok(true);
        }
        Ok(self
            .session
            .repository()
            .delete_user_session(&stored)
            .await?)
    }

    /// Registered adapter or store row, with expired sessions deleted.
    async fn load(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> SessionResult<Option<Arc<UserSessionAdapter>>> {
        if let Some(adapter) = self.registered(id) {
            if adapter.realm_id() != realm_id {
                return Ok(None);
            }
            if adapter.is_expired() {
                debug!(session_id = %id, "user session expired");
                self.delete(&adapter).await?;
                return Ok(None);
            }
            return Ok(Some(adapter));
        }

        let Some(stored) = self
            .session
            .repository()
            .get_user_session(realm_id, id)
            .await?
        else {
            return Ok(None);
        };
        let Some(realm) = self.realm_expiration(realm_id).await? else {
            return Ok(None);
        };
        self.live(stored, realm).await
    }

    async fn live(
        &self,
        stored: UserSession,
        realm: RealmExpiration,
    ) -> SessionResult<Option<Arc<UserSessionAdapter>>> {
        if let Some(adapter) = self.registered(stored.id) {
            if adapter.is_expired() {
                self.delete(&adapter).await?;
                return Ok(None);
            }
            return Ok(Some(adapter));
        }
        if stored.is_expired_at(self.now()) {
            debug!(session_id = %stored.id, "user session expired");
            self.session
                .repository()
                .delete_user_session(&stored)
                .await?;
            return Ok(None);
        }
        Ok(Some(self.wrap(stored, realm)))
    }

    async fn live_all(
        &self,
        realm_id: Uuid,
        sessions: Vec<UserSession>,
    ) -> SessionResult<Vec<Arc<UserSessionAdapter>>> {
        if sessions.is_empty() {
            return Ok(Vec::new());
        }
        let Some(realm) = self.realm_expiration(realm_id).await? else {
            return Ok(Vec::new());
        };
        let mut live = Vec::with_capacity(sessions.len());
        for stored in sessions {
            if let Some(adapter) = self.live(stored, realm).await? {
                live.push(adapter);
            }
        }
        Ok(live)
    }

    fn page(
        sessions: Vec<Arc<UserSessionAdapter>>,
        first: Option<usize>,
        max: Option<usize>,
    ) -> Vec<Arc<UserSessionAdapter>> {
        sessions
            .into_iter()
            .skip(first.unwrap_or(0))
            .take(max.unwrap_or(usize::MAX))
            .collect()
    }

    // === Online sessions ===

    /// Creates an online user session.
    ///
    /// Persistent sessions are written immediately and deleted again if the
    /// request rolls back. Transient sessions never reach the store.
    ///
    /// # Errors
    ///
    /// Invalid state when the realm does not exist, or store failure.
    pub async fn create_user_session(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
        login_username: &str,
        options: SessionOptions,
    ) -> SessionResult<Arc<UserSessionAdapter>> {
        self.session.ensure_open()?;
        let realm = self
            .realm_expiration(realm_id)
            .await?
            .ok_or(SessionError::RealmNotFound(realm_id))?;

        let mut session = UserSession::new(realm_id, user_id, login_username, self.now());
        options.apply(&mut session);
        session.expiration = expiration::user_session(&session, &realm).expires_at();

        if !session.is_transient() {
            let ttl = (session.expiration - self.now()).max(1);
            self.session
                .repository()
                .upsert_user_session(None, &session, Some(ttl))
                .await?;
            self.session
                .register_compensation(UndoCreate::UserSession(session.clone()));
        }
        debug!(session_id = %session.id, %realm_id, %user_id, "user session created");
        Ok(self.wrap(session, realm))
    }

    /// Gets an online user session.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_session(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> SessionResult<Option<Arc<UserSessionAdapter>>> {
        Ok(self
            .load(realm_id, id)
            .await?
            .filter(|adapter| !adapter.is_offline()))
    }

    /// Online sessions of a user.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_sessions(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
    ) -> SessionResult<Vec<Arc<UserSessionAdapter>>> {
        self.sessions_by_user(realm_id, user_id, false).await
    }

    async fn sessions_by_user(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
        offline: bool,
    ) -> SessionResult<Vec<Arc<UserSessionAdapter>>> {
        let stored = self
            .session
            .repository()
            .find_user_sessions_by_user(realm_id, user_id, offline)
            .await?;
        self.live_all(realm_id, stored).await
    }

    async fn sessions_by_client(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        offline: bool,
    ) -> SessionResult<Vec<Arc<UserSessionAdapter>>> {
        let stored = self
            .session
            .repository()
            .find_user_sessions_by_client(realm_id, client_id, offline)
            .await?;
        self.live_all(realm_id, stored).await
    }

    /// Online sessions holding a client session of `client_id`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_sessions_by_client(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        first: Option<usize>,
        max: Option<usize>,
    ) -> SessionResult<Vec<Arc<UserSessionAdapter>>> {
        let sessions = self.sessions_by_client(realm_id, client_id, false).await?;
        Ok(Self::page(sessions, first, max))
    }

    /// Online session created by an identity broker session.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_session_by_broker_session_id(
        &self,
        realm_id: Uuid,
        broker_session_id: &str,
    ) -> SessionResult<Option<Arc<UserSessionAdapter>>> {
        let stored = self
            .session
            .repository()
            .find_user_sessions_by_broker_session(realm_id, broker_session_id, false)
            .await?;
        Ok(self.live_all(realm_id, stored).await?.into_iter().next())
    }

    /// Online sessions of a user at an identity broker.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_sessions_by_broker_user_id(
        &self,
        realm_id: Uuid,
        broker_user_id: &str,
    ) -> SessionResult<Vec<Arc<UserSessionAdapter>>> {
        let stored = self
            .session
            .repository()
            .find_user_sessions_by_broker_user(realm_id, broker_user_id, false)
            .await?;
        self.live_all(realm_id, stored).await
    }

    /// Number of live online sessions holding a client session of
    /// `client_id`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_active_user_sessions_count(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
    ) -> SessionResult<usize> {
        Ok(self
            .sessions_by_client(realm_id, client_id, false)
            .await?
            .len())
    }

    /// Live client sessions per client id across the realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_active_client_sessions_stats(
        &self,
        realm_id: Uuid,
        offline: bool,
    ) -> SessionResult<HashMap<Uuid, usize>> {
        let stored = self
            .session
            .repository()
            .find_user_sessions_by_realm(realm_id, offline)
            .await?;
        let now = self.now();
        let mut stats = HashMap::new();
        for adapter in self.live_all(realm_id, stored).await? {
            let entity = adapter.entity();
            for client_session in entity.client_sessions.values() {
                if client_session.expiration > now {
                    *stats.entry(client_session.client_id).or_insert(0) += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Removes a user session. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_user_session(&self, realm_id: Uuid, id: Uuid) -> SessionResult<bool> {
        self.session.ensure_open()?;
        if let Some(adapter) = self.registered(id) {
            if adapter.realm_id() != realm_id {
                return Ok(false);
            }
            return self.delete(&adapter).await;
        }
        let repo = self.session.repository();
        match repo.get_user_session(realm_id, id).await? {
            Some(stored) => Ok(repo.delete_user_session(&stored).await?),
            None => Ok(false),
        }
    }

    /// Removes the online sessions of a user.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_user_sessions(&self, realm_id: Uuid, user_id: Uuid) -> SessionResult<()> {
        self.session.ensure_open()?;
        let stored = self
            .session
            .repository()
            .find_user_sessions_by_user(realm_id, user_id, false)
            .await?;
        self.delete_all(stored).await?;
        self.delete_registered(|adapter| {
            adapter.realm_id() == realm_id && adapter.user_id() == user_id && !adapter.is_offline()
        })
        .await
    }

    /// Removes every online session of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_all_user_sessions(&self, realm_id: Uuid) -> SessionResult<()> {
        self.session.ensure_open()?;
        let stored = self
            .session
            .repository()
            .find_user_sessions_by_realm(realm_id, false)
            .await?;
        self.delete_all(stored).await?;
        self.delete_registered(|adapter| adapter.realm_id() == realm_id && !adapter.is_offline())
            .await
    }

    async fn delete_all(&self, sessions: Vec<UserSession>) -> SessionResult<()> {
        for stored in sessions {
            match self.registered(stored.id) {
                Some(adapter) => {
                    self.delete(&adapter).await?;
                }
                None => {
                    self.session
                        .repository()
                        .delete_user_session(&stored)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Deletes registered sessions matching `filter`, which catches
    /// transient sessions the store never saw.
    async fn delete_registered(
        &self,
        filter: impl Fn(&UserSessionAdapter) -> bool,
    ) -> SessionResult<()> {
        let registry = self.session.registry();
        let matching: Vec<Arc<UserSessionAdapter>> = registry
            .adapters()
            .into_iter()
            .filter(|adapter| adapter.kind() == kinds::USER_SESSION)
            .filter_map(|adapter| registry.get::<UserSessionAdapter>(kinds::USER_SESSION, adapter.id()))
            .filter(|adapter| filter(adapter))
            .collect();
        for adapter in matching {
            self.delete(&adapter).await?;
        }
        Ok(())
    }

    /// Expired sessions are deleted when read and dropped by the store TTL,
    /// so there is nothing to sweep.
    pub fn remove_all_expired(&self) {
        debug!(session = %self.session.id(), "expired sessions are removed lazily");
    }

    // === Client sessions ===

    /// Attaches a client session for `client_id` to `user_session`,
    /// replacing any previous one of that client.
    ///
    /// # Errors
    ///
    /// Invalid state when the user session was removed or the client does
    /// not exist, or store failure.
    pub async fn create_client_session(
        &self,
        user_session: &Arc<UserSessionAdapter>,
        client_id: Uuid,
    ) -> SessionResult<ClientSessionAdapter> {
        self.session.ensure_open()?;
        if user_session.is_discarded() {
            return Err(SessionError::UserSessionNotFound(user_session.id()));
        }
        let client = self
            .client_expiration(user_session.realm_id(), client_id)
            .await?;
        let client_session =
            AuthenticatedClientSession::new(client_id, user_session.is_offline(), self.now());
        user_session.attach_client_session(client_session, client)?;
        Ok(ClientSessionAdapter::new(Arc::clone(user_session), client_id))
    }

    // === Offline sessions ===

    /// Creates the offline twin of an online session, or returns the
    /// existing one.
    ///
    /// Both sessions get a note naming the other. The offline session is
    /// written first, the online one right after; a failure in between
    /// leaves a one-sided link that reads as "no twin".
    ///
    /// # Errors
    ///
    /// Invalid state when `online` is offline or removed, or store failure.
    pub async fn create_offline_user_session(
        &self,
        online: &Arc<UserSessionAdapter>,
    ) -> SessionResult<Arc<UserSessionAdapter>> {
        self.session.ensure_open()?;
        online.ensure_live()?;
        if online.is_offline() {
            return Err(SessionError::Invalid(format!(
                "user session {} is already offline",
                online.id()
            )));
        }
        let realm_id = online.realm_id();
        if let Some(twin_id) = online.corresponding_session_id()
            && let Some(existing) = self.load(realm_id, twin_id).await?
            && existing.is_offline()
            && existing.corresponding_session_id() == Some(online.id())
        {
            return Ok(existing);
        }

        let realm = *online.realm_expiration();
        let mut offline = online.entity().to_offline(self.now());
        offline.notes.insert(
            kc_model::session::notes::CORRESPONDING_SESSION_ID.to_string(),
            online.id().to_string(),
        );
        offline.expiration = expiration::user_session(&offline, &realm).expires_at();
        let ttl = (offline.expiration - self.now()).max(1);
        let repo = self.session.repository();
        repo.upsert_user_session(None, &offline, Some(ttl)).await?;
        self.session
            .register_compensation(UndoCreate::UserSession(offline.clone()));

        online.link_twin(Some(offline.id))?;
        online.flush(repo).await?;
        debug!(online = %online.id(), offline = %offline.id, "offline session created");
        Ok(self.wrap(offline, realm))
    }

    /// Gets an offline session by its own id or by the id of its online
    /// twin.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_offline_user_session(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> SessionResult<Option<Arc<UserSessionAdapter>>> {
        let Some(found) = self.load(realm_id, id).await? else {
            return Ok(None);
        };
        if found.is_offline() {
            return Ok(Some(found));
        }
        let Some(twin_id) = found.corresponding_session_id() else {
            return Ok(None);
        };
        Ok(self
            .load(realm_id, twin_id)
            .await?
            .filter(|twin| twin.is_offline() && twin.corresponding_session_id() == Some(id)))
    }

    /// Removes an offline session and clears the link on its online twin.
    /// Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_offline_user_session(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> SessionResult<bool> {
        self.session.ensure_open()?;
        let Some(offline) = self.get_offline_user_session(realm_id, id).await? else {
            return Ok(false);
        };
        if let Some(twin_id) = offline.corresponding_session_id()
            && let Some(online) = self.load(realm_id, twin_id).await?
            && online.corresponding_session_id() == Some(offline.id())
        {
            online.link_twin(None)?;
        }
        self.delete(&offline).await
    }

    /// Copies a client session into an offline session.
    ///
    /// # Errors
    ///
    /// Invalid state when `offline` is not offline, the client session was
    /// detached or the client no longer exists, or store failure.
    pub async fn create_offline_client_session(
        &self,
        client_session: &ClientSessionAdapter,
        offline: &Arc<UserSessionAdapter>,
    ) -> SessionResult<ClientSessionAdapter> {
        self.session.ensure_open()?;
        if offline.is_discarded() {
            return Err(SessionError::UserSessionNotFound(offline.id()));
        }
        if !offline.is_offline() {
            return Err(SessionError::Invalid(format!(
                "user session {} is not offline",
                offline.id()
            )));
        }
        let entity = client_session.entity().ok_or_else(|| {
            SessionError::Invalid(format!(
                "client session of client {} is no longer attached",
                client_session.client_id()
            ))
        })?;
        let client = self
            .client_expiration(offline.realm_id(), entity.client_id)
            .await?;
        let copy = entity.to_offline(self.now());
        let client_id = copy.client_id;
        offline.attach_client_session(copy, client)?;
        Ok(ClientSessionAdapter::new(Arc::clone(offline), client_id))
    }

    /// Offline sessions of a user.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_offline_user_sessions(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
    ) -> SessionResult<Vec<Arc<UserSessionAdapter>>> {
        self.sessions_by_user(realm_id, user_id, true).await
    }

    /// Offline sessions holding a client session of `client_id`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_offline_user_sessions_by_client(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        first: Option<usize>,
        max: Option<usize>,
    ) -> SessionResult<Vec<Arc<UserSessionAdapter>>> {
        let sessions = self.sessions_by_client(realm_id, client_id, true).await?;
        Ok(Self::page(sessions, first, max))
    }

    /// Number of live offline sessions holding a client session of
    /// `client_id`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_offline_sessions_count(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
    ) -> SessionResult<usize> {
        Ok(self
            .sessions_by_client(realm_id, client_id, true)
            .await?
            .len())
    }

    // === Removal hooks ===

    /// Removes every online and offline session of a removed realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn on_realm_removed(&self, realm_id: Uuid) -> SessionResult<()> {
        self.session.ensure_open()?;
        let repo = self.session.repository();
        for offline in [false, true] {
            let stored = repo.find_user_sessions_by_realm(realm_id, offline).await?;
            self.delete_all(stored).await?;
        }
        self.delete_registered(|adapter| adapter.realm_id() == realm_id)
            .await
    }

    /// Drops the client sessions of a removed client. The owning sessions
    /// are written on commit.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn on_client_removed(&self, realm_id: Uuid, client_id: Uuid) -> SessionResult<()> {
        self.session.ensure_open()?;
        for offline in [false, true] {
            for adapter in self.sessions_by_client(realm_id, client_id, offline).await? {
                adapter.remove_authenticated_client_sessions([client_id])?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kc_model::SessionState;
    use kc_model::client::CLIENT_SESSION_IDLE_TIMEOUT;
    use kc_model::session::notes;

    use super::*;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn create_and_get_share_adapter() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));

        let created = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        let loaded = provider
            .get_user_session(realm_id, created.id())
            .await
            .unwrap()
            .unwrap();

        assert!(Arc::ptr_eq(&created, &loaded));
        assert_eq!(created.expiration(), created.started() + 1_800);
    }

    #[tokio::test]
    async fn unknown_realm_rejected() {
        let harness = Harness::new();
        let provider = UserSessionProvider::new(harness.session());

        let err = provider
            .create_user_session(Uuid::now_v7(), Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::RealmNotFound(_)));
    }

    #[tokio::test]
    async fn expired_session_deleted_on_read() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let created = UserSessionProvider::new(Arc::clone(&session))
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        let id = created.id();
        session.commit().await.unwrap();

        harness.clock.advance(1_801);

        let provider = UserSessionProvider::new(harness.session());
        assert!(provider.get_user_session(realm_id, id).await.unwrap().is_none());
        assert!(!provider.remove_user_session(realm_id, id).await.unwrap());
    }

    #[tokio::test]
    async fn refresh_extends_and_is_written_on_commit() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let created = UserSessionProvider::new(Arc::clone(&session))
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        let id = created.id();

        harness.clock.advance(1_000);
        created
            .set_last_session_refresh(harness.clock.current_time())
            .unwrap();
        created.set_state(SessionState::LoggingOut).unwrap();
        session.commit().await.unwrap();

        harness.clock.advance(1_000);
        let loaded = UserSessionProvider::new(harness.session())
            .get_user_session(realm_id, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.state(), SessionState::LoggingOut);
    }

    #[tokio::test]
    async fn rollback_deletes_created_session() {
        let harness = Harness::new();
        let setup = harness.session();
        let (realm_id, _) = harness.realm_and_client(&setup).await;
        setup.commit().await.unwrap();

        let session = harness.session();
        let created = UserSessionProvider::new(Arc::clone(&session))
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        let id = created.id();
        session.rollback().await.unwrap();

        let provider = UserSessionProvider::new(harness.session());
        assert!(provider.get_user_session(realm_id, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transient_session_never_stored() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let created = provider
            .create_user_session(
                realm_id,
                Uuid::now_v7(),
                "alice",
                SessionOptions::new().transient(),
            )
            .await
            .unwrap();
        let id = created.id();
        assert!(provider.get_user_session(realm_id, id).await.unwrap().is_some());
        session.commit().await.unwrap();

        let provider = UserSessionProvider::new(harness.session());
        assert!(provider.get_user_session(realm_id, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn client_session_requires_existing_client() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let user_session = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();

        let err = provider
            .create_client_session(&user_session, Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(err.is_invalid_state());

        let client_session = provider
            .create_client_session(&user_session, client_id)
            .await
            .unwrap();
        client_session.set_note("scope", "openid").unwrap();
        assert_eq!(client_session.is_offline(), Some(false));
        assert_eq!(
            provider
                .get_active_user_sessions_count(realm_id, client_id)
                .await
                .unwrap(),
            0,
            "index is written on commit"
        );

        session.commit().await.unwrap();
        let provider = UserSessionProvider::new(harness.session());
        assert_eq!(
            provider
                .get_active_user_sessions_count(realm_id, client_id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn client_session_on_removed_parent_rejected() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let user_session = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        provider
            .remove_user_session(realm_id, user_session.id())
            .await
            .unwrap();

        let err = provider
            .create_client_session(&user_session, client_id)
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::UserSessionNotFound(_)));
    }

    #[tokio::test]
    async fn pruning_drops_mismatched_and_orphaned_children() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let user_session = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        provider
            .create_client_session(&user_session, client_id)
            .await
            .unwrap();
        let orphan = Uuid::now_v7();
        user_session
            .attach_client_session(
                AuthenticatedClientSession::new(orphan, false, harness.clock.current_time()),
                ClientExpiration::default(),
            )
            .unwrap();
        let mismatched = Uuid::now_v7();
        user_session
            .attach_client_session(
                AuthenticatedClientSession::new(mismatched, true, harness.clock.current_time()),
                ClientExpiration::default(),
            )
            .unwrap();

        let live = user_session.authenticated_client_sessions().await.unwrap();

        assert_eq!(live.len(), 1);
        assert!(live.contains_key(&client_id));
        assert_eq!(user_session.entity().client_sessions.len(), 1);
    }

    #[tokio::test]
    async fn expired_client_session_pruned() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let user_session = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        provider
            .create_client_session(&user_session, client_id)
            .await
            .unwrap();
        user_session.set_client_idle_timeout_override(10).unwrap();

        harness.clock.advance(11);

        assert!(
            user_session
                .authenticated_client_session_by_client(client_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn offline_twin_links_both_ways() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let online = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();

        let offline = provider.create_offline_user_session(&online).await.unwrap();
        let again = provider.create_offline_user_session(&online).await.unwrap();

        assert!(Arc::ptr_eq(&offline, &again));
        assert!(offline.is_offline());
        assert_eq!(online.corresponding_session_id(), Some(offline.id()));
        assert_eq!(offline.corresponding_session_id(), Some(online.id()));
        let by_online_id = provider
            .get_offline_user_session(realm_id, online.id())
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&offline, &by_online_id));
    }

    #[tokio::test]
    async fn removing_offline_clears_online_link() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let online = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        let offline = provider.create_offline_user_session(&online).await.unwrap();

        assert!(
            provider
                .remove_offline_user_session(realm_id, offline.id())
                .await
                .unwrap()
        );

        assert_eq!(online.note(notes::CORRESPONDING_SESSION_ID), None);
        assert!(
            provider
                .get_offline_user_session(realm_id, online.id())
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            !provider
                .remove_offline_user_session(realm_id, offline.id())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn offline_client_session_copied() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let online = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        let client_session = provider
            .create_client_session(&online, client_id)
            .await
            .unwrap();
        client_session.set_redirect_uri("https://app/cb").unwrap();
        let offline = provider.create_offline_user_session(&online).await.unwrap();

        let copy = provider
            .create_offline_client_session(&client_session, &offline)
            .await
            .unwrap();
        let err = provider
            .create_offline_client_session(&client_session, &online)
            .await
            .unwrap_err();

        assert_eq!(copy.is_offline(), Some(true));
        assert_eq!(copy.redirect_uri().as_deref(), Some("https://app/cb"));
        assert_ne!(copy.id(), client_session.id());
        assert!(matches!(err, SessionError::Invalid(_)));
    }

    #[tokio::test]
    async fn client_removal_drops_client_sessions() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let user_session = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        provider
            .create_client_session(&user_session, client_id)
            .await
            .unwrap();
        session.commit().await.unwrap();

        let session = harness.session();
        let provider = UserSessionProvider::new(Arc::clone(&session));
        provider.on_client_removed(realm_id, client_id).await.unwrap();
        session.commit().await.unwrap();

        let provider = UserSessionProvider::new(harness.session());
        assert_eq!(
            provider
                .get_active_user_sessions_count(realm_id, client_id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn realm_removal_drops_all_sessions() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let user_id = Uuid::now_v7();
        let online = provider
            .create_user_session(realm_id, user_id, "alice", SessionOptions::new())
            .await
            .unwrap();
        provider.create_offline_user_session(&online).await.unwrap();

        provider.on_realm_removed(realm_id).await.unwrap();

        assert!(provider.get_user_sessions(realm_id, user_id).await.unwrap().is_empty());
        assert!(
            provider
                .get_offline_user_sessions(realm_id, user_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn stored_client_limit_survives_later_mutation() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, client_id) = harness.realm_and_client(&session).await;
        ClientProvider::new(Arc::clone(&session))
            .get_client_by_id(realm_id, client_id)
            .await
            .unwrap()
            .unwrap()
            .set_attribute(CLIENT_SESSION_IDLE_TIMEOUT, "60")
            .unwrap();
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let user_session = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        provider
            .create_client_session(&user_session, client_id)
            .await
            .unwrap();
        let id = user_session.id();
        let expected = harness.clock.current_time() + 60;
        session.commit().await.unwrap();

        let session = harness.session();
        let loaded = UserSessionProvider::new(Arc::clone(&session))
            .get_user_session(realm_id, id)
            .await
            .unwrap()
            .unwrap();
        loaded.set_note("step", "2").unwrap();
        assert_eq!(loaded.entity().client_sessions[&client_id].expiration, expected);

        harness.clock.advance(100);
        assert!(loaded.authenticated_client_sessions().await.unwrap().is_empty());
        session.commit().await.unwrap();

        let reloaded = UserSessionProvider::new(harness.session())
            .get_user_session(realm_id, id)
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.entity().client_sessions.is_empty());
    }

    #[tokio::test]
    async fn one_sided_twin_link_reads_as_absent() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let dangling = provider
            .create_user_session(realm_id, Uuid::now_v7(), "alice", SessionOptions::new())
            .await
            .unwrap();
        dangling
            .set_note(notes::CORRESPONDING_SESSION_ID, Uuid::now_v7().to_string())
            .unwrap();
        let online = provider
            .create_user_session(realm_id, Uuid::now_v7(), "bob", SessionOptions::new())
            .await
            .unwrap();
        let offline = provider.create_offline_user_session(&online).await.unwrap();
        let impostor = provider
            .create_user_session(realm_id, Uuid::now_v7(), "carol", SessionOptions::new())
            .await
            .unwrap();
        impostor
            .set_note(notes::CORRESPONDING_SESSION_ID, offline.id().to_string())
            .unwrap();
        let (dangling_id, online_id, impostor_id, offline_id) =
            (dangling.id(), online.id(), impostor.id(), offline.id());
        session.commit().await.unwrap();

        let provider = UserSessionProvider::new(harness.session());
        assert!(
            provider
                .get_offline_user_session(realm_id, dangling_id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            provider
                .get_offline_user_session(realm_id, impostor_id)
                .await
                .unwrap()
                .is_none()
        );
        let found = provider
            .get_offline_user_session(realm_id, online_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), offline_id);
    }

    #[tokio::test]
    async fn removing_user_sessions_covers_transient_ones() {
        let harness = Harness::new();
        let session = harness.session();
        let (realm_id, _) = harness.realm_and_client(&session).await;
        let provider = UserSessionProvider::new(Arc::clone(&session));
        let user_id = Uuid::now_v7();
        let transient = provider
            .create_user_session(realm_id, user_id, "alice", SessionOptions::new().transient())
            .await
            .unwrap();
        let stored = provider
            .create_user_session(realm_id, user_id, "alice", SessionOptions::new())
            .await
            .unwrap();
        let other = provider
            .create_user_session(
                realm_id,
                Uuid::now_v7(),
                "bob",
                SessionOptions::new().transient(),
            )
            .await
            .unwrap();

        provider.remove_user_sessions(realm_id, user_id).await.unwrap();

        for id in [transient.id(), stored.id()] {
            assert!(provider.get_user_session(realm_id, id).await.unwrap().is_none());
        }
        assert!(
            provider
                .get_user_session(realm_id, other.id())
                .await
                .unwrap()
                .is_some()
        );
    }
}
