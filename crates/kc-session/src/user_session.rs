//! User session adapter.
//!
//! A [`UserSessionAdapter`] owns the client sessions of its user session:
//! they are stored inside the same row, so every client-session change goes
//! through the parent and is written when the parent flushes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kc_core::Clock;
use kc_model::session::notes;
use kc_model::{
    AuthenticatedClientSession, ExpirationOverrides, PersistenceState, SessionState, UserSession,
};
use kc_repository::CompositeRepository;
use kc_spi::{Dirtyable, EntityCell, Flushable, Identifiable, kinds};
use kc_storage::StorageResult;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::client_session::ClientSessionAdapter;
use crate::error::SessionResult;
use crate::expiration::{self, ClientExpiration, Override, RealmExpiration};

/// Optional attributes of a new or restarted user session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Caller-chosen session id.
    pub id: Option<Uuid>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Authentication method.
    pub auth_method: Option<String>,
    /// "Remember Me" was ticked.
    pub remember_me: bool,
    /// Session id at the identity broker.
    pub broker_session_id: Option<String>,
    /// User id at the identity broker.
    pub broker_user_id: Option<String>,
    /// Whether the session is written to the store.
    pub persistence_state: PersistenceState,
}

impl SessionOptions {
    /// Default options: persistent, no broker, no "Remember Me".
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a caller-chosen id.
    #[must_use]
    pub const fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the client IP address.
    #[must_use]
    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn auth_method(mut self, method: impl Into<String>) -> Self {
        self.auth_method = Some(method.into());
        self
    }

    /// Sets the "Remember Me" flag.
    #[must_use]
    pub const fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    /// Sets the broker session and user ids.
    #[must_use]
    pub fn broker(
        mut self,
        broker_session_id: impl Into<String>,
        broker_user_id: impl Into<String>,
    ) -> Self {
        self.broker_session_id = Some(broker_session_id.into());
        self.broker_user_id = Some(broker_user_id.into());
        self
    }

    /// Keeps the session out of the store.
    #[must_use]
    pub const fn transient(mut self) -> Self {
        self.persistence_state = PersistenceState::Transient;
        self
    }

    pub(crate) fn apply(self, session: &mut UserSession) {
        if let Some(id) = self.id {
            session.id = id;
        }
        session.ip_address = self.ip_address;
        session.auth_method = self.auth_method;
        session.remember_me = self.remember_me;
        session.broker_session_id = self.broker_session_id;
        session.broker_user_id = self.broker_user_id;
        session.persistence_state = self.persistence_state;
    }
}

/// Request-scoped view of one user session.
#[derive(Debug)]
pub struct UserSessionAdapter {
    cell: EntityCell<UserSession>,
    realm: RealmExpiration,
    clients: Mutex<HashMap<Uuid, ClientExpiration>>,
    clock: Clock,
    repo: Arc<CompositeRepository>,
}

impl UserSessionAdapter {
    pub(crate) fn new(
        session: UserSession,
        realm: RealmExpiration,
        clock: Clock,
        repo: Arc<CompositeRepository>,
    ) -> Self {
        let cell = if session.is_transient() {
            EntityCell::unsaved(kinds::USER_SESSION, session)
        } else {
            EntityCell::loaded(kinds::USER_SESSION, session)
        };
        Self {
            cell,
            realm,
            clients: Mutex::new(HashMap::new()),
            clock,
            repo,
        }
    }

    /// Recomputes the session expiry and the expiry of every client session
    /// whose client limits are loaded. The others keep their stored value
    /// until [`Self::load_client_expirations`] runs.
    fn recompute(&self, session: &mut UserSession) {
        session.expiration = expiration::user_session(session, &self.realm).expires_at();
        let clients = self.clients.lock();
        let computed: Vec<(Uuid, i64)> = session
            .client_sessions
            .iter()
            .filter_map(|(client_id, cs)| {
                let client = clients.get(client_id)?;
                let at = expiration::client_session(cs, session, &self.realm, client);
                Some((*client_id, at.expires_at()))
            })
            .collect();
        for (client_id, at) in computed {
            if let Some(cs) = session.client_sessions.get_mut(&client_id) {
                cs.expiration = at;
            }
        }
    }

    fn modify<R>(&self, f: impl FnOnce(&mut UserSession) -> R) -> StorageResult<R> {
        self.cell.update(|session| {
            let result = f(session);
            self.recompute(session);
            result
        })
    }

    pub(crate) const fn realm_expiration(&self) -> &RealmExpiration {
        &self.realm
    }

    /// Copy the store holds, or the working copy when never written.
    pub(crate) fn stored(&self) -> UserSession {
        self.cell.persisted().unwrap_or_else(|| self.cell.snapshot())
    }

    pub(crate) fn ensure_live(&self) -> StorageResult<()> {
        self.cell.ensure_live()
    }

    pub(crate) fn is_discarded(&self) -> bool {
        self.cell.is_discarded()
    }

    pub(crate) fn read_client_session<R>(
        &self,
        client_id: Uuid,
        f: impl FnOnce(&AuthenticatedClientSession) -> R,
    ) -> Option<R> {
        self.cell.read(|s| s.client_sessions.get(&client_id).map(f))
    }

    /// Applies `f` to one client session. Returns `false` when it is gone.
    pub(crate) fn modify_client_session(
        &self,
        client_id: Uuid,
        f: impl FnOnce(&mut AuthenticatedClientSession),
    ) -> StorageResult<bool> {
        self.modify(|s| s.client_sessions.get_mut(&client_id).map(f).is_some())
    }

    pub(crate) fn attach_client_session(
        &self,
        client_session: AuthenticatedClientSession,
        client: ClientExpiration,
    ) -> StorageResult<()> {
        self.clients.lock().insert(client_session.client_id, client);
        self.modify(|s| {
            s.client_sessions
                .insert(client_session.client_id, client_session);
        })
    }

    // === Getters ===

    /// Session ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.cell.read(|s| s.id)
    }

    /// Realm ID.
    #[must_use]
    pub fn realm_id(&self) -> Uuid {
        self.cell.read(|s| s.realm_id)
    }

    /// User ID.
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.cell.read(|s| s.user_id)
    }

    /// Username typed at login.
    #[must_use]
    pub fn login_username(&self) -> String {
        self.cell.read(|s| s.login_username.clone())
    }

    /// Client IP address.
    #[must_use]
    pub fn ip_address(&self) -> Option<String> {
        self.cell.read(|s| s.ip_address.clone())
    }

    /// Authentication method.
    #[must_use]
    pub fn auth_method(&self) -> Option<String> {
        self.cell.read(|s| s.auth_method.clone())
    }

    /// Whether "Remember Me" was ticked.
    #[must_use]
    pub fn is_remember_me(&self) -> bool {
        self.cell.read(|s| s.remember_me)
    }

    /// Session id at the identity broker.
    #[must_use]
    pub fn broker_session_id(&self) -> Option<String> {
        self.cell.read(|s| s.broker_session_id.clone())
    }

    /// User id at the identity broker.
    #[must_use]
    pub fn broker_user_id(&self) -> Option<String> {
        self.cell.read(|s| s.broker_user_id.clone())
    }

    /// Whether this is an offline session.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.cell.read(|s| s.offline)
    }

    /// Start time (epoch seconds).
    #[must_use]
    pub fn started(&self) -> i64 {
        self.cell.read(|s| s.started)
    }

    /// Last refresh (epoch seconds).
    #[must_use]
    pub fn last_session_refresh(&self) -> i64 {
        self.cell.read(|s| s.last_session_refresh)
    }

    /// Computed expiry (epoch seconds).
    #[must_use]
    pub fn expiration(&self) -> i64 {
        self.cell.read(|s| s.expiration)
    }

    /// Whether the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = self.clock.current_time();
        self.cell.read(|s| s.is_expired_at(now))
    }

    /// Session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.cell.read(|s| s.state)
    }

    /// Persistence state.
    #[must_use]
    pub fn persistence_state(&self) -> PersistenceState {
        self.cell.read(|s| s.persistence_state)
    }

    /// Session-level expiration overrides.
    #[must_use]
    pub fn expiration_overrides(&self) -> ExpirationOverrides {
        self.cell.read(|s| s.expiration_overrides)
    }

    /// Gets a note.
    #[must_use]
    pub fn note(&self, key: &str) -> Option<String> {
        self.cell.read(|s| s.notes.get(key).cloned())
    }

    /// All notes.
    #[must_use]
    pub fn notes(&self) -> HashMap<String, String> {
        self.cell.read(|s| s.notes.clone())
    }

    /// Id of the offline/online twin, if linked.
    #[must_use]
    pub fn corresponding_session_id(&self) -> Option<Uuid> {
        self.cell.read(UserSession::corresponding_session_id)
    }

    /// Clones the working copy.
    #[must_use]
    pub fn entity(&self) -> UserSession {
        self.cell.snapshot()
    }

    // === Setters ===

    /// Records a refresh and recomputes the expiry.
    pub fn set_last_session_refresh(&self, seconds: i64) -> StorageResult<()> {
        self.modify(|s| s.last_session_refresh = seconds)
    }

    /// Sets the session state.
    pub fn set_state(&self, state: SessionState) -> StorageResult<()> {
        self.modify(|s| s.state = state)
    }

    /// Sets a note.
    pub fn set_note(&self, key: impl Into<String>, value: impl Into<String>) -> StorageResult<()> {
        let (key, value) = (key.into(), value.into());
        self.modify(|s| {
            s.notes.insert(key, value);
        })
    }

    /// Removes a note.
    pub fn remove_note(&self, key: &str) -> StorageResult<()> {
        self.modify(|s| {
            s.notes.remove(key);
        })
    }

    pub(crate) fn link_twin(&self, twin: Option<Uuid>) -> StorageResult<()> {
        self.modify(|s| match twin {
            Some(id) => {
                s.notes
                    .insert(notes::CORRESPONDING_SESSION_ID.to_string(), id.to_string());
            }
            None => {
                s.notes.remove(notes::CORRESPONDING_SESSION_ID);
            }
        })
    }

    /// Starts the session over for `user_id`: timestamps reset, notes and
    /// client sessions dropped, state back to active.
    pub fn restart(
        &self,
        user_id: Uuid,
        login_username: impl Into<String>,
        options: SessionOptions,
    ) -> StorageResult<()> {
        let login_username = login_username.into();
        let now = self.clock.current_time();
        self.modify(|s| {
            let id = s.id;
            let persistence_state = s.persistence_state;
            s.user_id = user_id;
            s.login_username = login_username;
            options.apply(s);
            s.id = id;
            s.persistence_state = persistence_state;
            s.started = now;
            s.last_session_refresh = now;
            s.state = SessionState::Active;
            s.notes.clear();
            s.client_sessions.clear();
            s.expiration_overrides = ExpirationOverrides::default();
        })
    }

    // === Expiration overrides ===

    /// Sets an override unless it would loosen the current one. Returns
    /// whether it was applied.
    pub fn set_expiration_override(&self, which: Override, seconds: i64) -> StorageResult<bool> {
        self.cell.ensure_live()?;
        let mut overrides = self.expiration_overrides();
        if !expiration::tighten(&mut overrides, which, seconds) {
            return Ok(false);
        }
        self.modify(|s| s.expiration_overrides = overrides)?;
        Ok(true)
    }

    /// Tightens the online session max lifespan.
    pub fn set_session_max_lifespan_override(&self, seconds: i64) -> StorageResult<bool> {
        self.set_expiration_override(Override::SessionMaxLifespan, seconds)
    }

    /// Tightens the online session idle timeout.
    pub fn set_session_idle_timeout_override(&self, seconds: i64) -> StorageResult<bool> {
        self.set_expiration_override(Override::SessionIdleTimeout, seconds)
    }

    /// Tightens the offline session max lifespan.
    pub fn set_offline_session_max_lifespan_override(&self, seconds: i64) -> StorageResult<bool> {
        self.set_expiration_override(Override::OfflineSessionMaxLifespan, seconds)
    }

    /// Tightens the offline session idle timeout.
    pub fn set_offline_session_idle_timeout_override(&self, seconds: i64) -> StorageResult<bool> {
        self.set_expiration_override(Override::OfflineSessionIdleTimeout, seconds)
    }

    /// Tightens the online client session max lifespan.
    pub fn set_client_max_lifespan_override(&self, seconds: i64) -> StorageResult<bool> {
        self.set_expiration_override(Override::ClientMaxLifespan, seconds)
    }

    /// Tightens the online client session idle timeout.
    pub fn set_client_idle_timeout_override(&self, seconds: i64) -> StorageResult<bool> {
        self.set_expiration_override(Override::ClientIdleTimeout, seconds)
    }

    /// Tightens the offline client session max lifespan.
    pub fn set_offline_client_max_lifespan_override(&self, seconds: i64) -> StorageResult<bool> {
        self.set_expiration_override(Override::OfflineClientMaxLifespan, seconds)
    }

    /// Tightens the offline client session idle timeout.
    pub fn set_offline_client_idle_timeout_override(&self, seconds: i64) -> StorageResult<bool> {
        self.set_expiration_override(Override::OfflineClientIdleTimeout, seconds)
    }

    // === Client sessions ===

    /// Live client sessions keyed by client id.
    ///
    /// Client sessions that expired, whose offline flag differs from this
    /// session, or whose client no longer exists are removed on the way.
    ///
    /// # Errors
    ///
    /// Store failure while checking clients.
    pub async fn authenticated_client_sessions(
        self: &Arc<Self>,
    ) -> SessionResult<HashMap<Uuid, ClientSessionAdapter>> {
        let now = self.clock.current_time();
        let session = self.cell.snapshot();

        let mut live = HashMap::new();
        let mut stale = Vec::new();
        for (client_id, cs) in &session.client_sessions {
            let client_id = *client_id;
            if cs.offline != session.offline {
                stale.push(client_id);
                continue;
            }
            let Some(client) = self.repo.get_client(session.realm_id, client_id).await? else {
                stale.push(client_id);
                continue;
            };
            let limits = ClientExpiration::from(&client);
            let expires_at =
                expiration::client_session(cs, &session, &self.realm, &limits).expires_at();
            if expires_at <= now {
                stale.push(client_id);
                continue;
            }
            self.clients.lock().insert(client_id, limits);
            live.insert(
                client_id,
                ClientSessionAdapter::new(Arc::clone(self), client_id),
            );
        }

        if !stale.is_empty() {
            debug!(session_id = %self.id(), pruned = stale.len(), "client sessions pruned");
            self.remove_authenticated_client_sessions(stale)?;
        }
        Ok(live)
    }

    /// Live client session of one client.
    ///
    /// # Errors
    ///
    /// Store failure while checking clients.
    pub async fn authenticated_client_session_by_client(
        self: &Arc<Self>,
        client_id: Uuid,
    ) -> SessionResult<Option<ClientSessionAdapter>> {
        Ok(self
            .authenticated_client_sessions()
            .await?
            .remove(&client_id))
    }

    /// Removes the client sessions of the given clients.
    pub fn remove_authenticated_client_sessions(
        &self,
        client_ids: impl IntoIterator<Item = Uuid>,
    ) -> StorageResult<()> {
        let client_ids: Vec<Uuid> = client_ids.into_iter().collect();
        {
            let mut clients = self.clients.lock();
            for client_id in &client_ids {
                clients.remove(client_id);
            }
        }
        self.modify(|s| {
            for client_id in &client_ids {
                s.client_sessions.remove(client_id);
            }
        })
    }

    async fn load_client_expirations(&self, repo: &CompositeRepository) -> StorageResult<()> {
        let (realm_id, missing) = self.cell.read(|s| {
            let clients = self.clients.lock();
            let missing: Vec<Uuid> = s
                .client_sessions
                .keys()
                .filter(|id| !clients.contains_key(id))
                .copied()
                .collect();
            (s.realm_id, missing)
        });
        for client_id in missing {
            let expiration = repo
                .get_client(realm_id, client_id)
                .await?
                .map(|client| ClientExpiration::from(&client))
                .unwrap_or_default();
            self.clients.lock().insert(client_id, expiration);
        }
        Ok(())
    }
}

impl Identifiable for UserSessionAdapter {
    fn kind(&self) -> &'static str {
        kinds::USER_SESSION
    }

    fn id(&self) -> Uuid {
        self.cell.read(|s| s.id)
    }
}

impl Dirtyable for UserSessionAdapter {
    fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    fn mark_dirty(&self) {
        self.cell.mark_dirty();
    }
}

#[async_trait]
impl Flushable for UserSessionAdapter {
    async fn flush(&self, repo: &CompositeRepository) -> StorageResult<bool> {
        if !self.cell.is_dirty() {
            return Ok(false);
        }
        if self.cell.read(UserSession::is_transient) {
            if let Some(write) = self.cell.pending() {
                self.cell.complete(write);
            }
            return Ok(false);
        }

        self.load_client_expirations(repo).await?;
        self.cell.update_silently(|s| self.recompute(s));
        let Some(write) = self.cell.pending() else {
            return Ok(false);
        };
        let ttl = (write.current.expiration - self.clock.current_time()).max(1);
        repo.upsert_user_session(write.previous.as_ref(), &write.current, Some(ttl))
            .await?;
        debug!(session_id = %write.current.id, ttl, "user session flushed");
        self.cell.complete(write);
        Ok(true)
    }

    fn discard(&self) {
        self.cell.discard();
    }
}
