//! User session (SSO session) and client session models.
//!
//! A [`UserSession`] owns one [`AuthenticatedClientSession`] per client the
//! user has logged into. Online and offline sessions share the same shape and
//! are told apart by the `offline` flag. Timestamps are epoch seconds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Session is active and valid.
    #[default]
    Active,
    /// Logout is in progress.
    LoggingOut,
    /// Session is logged out but not yet expired.
    LoggedOut,
    /// Session is logged out via backchannel without confirmation.
    LoggedOutUnconfirmed,
}

/// Whether a session is written to the store at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistenceState {
    /// Session is stored.
    #[default]
    Persistent,
    /// Session lives only for the current request.
    Transient,
}

/// Session-level overrides of the realm/client expiration settings (seconds).
///
/// Each value may only ever be tightened once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationOverrides {
    /// Online session max lifespan.
    pub session_max_lifespan: Option<i64>,
    /// Online session idle timeout.
    pub session_idle_timeout: Option<i64>,
    /// Offline session max lifespan.
    pub offline_session_max_lifespan: Option<i64>,
    /// Offline session idle timeout.
    pub offline_session_idle_timeout: Option<i64>,
    /// Online client session max lifespan.
    pub client_max_lifespan: Option<i64>,
    /// Online client session idle timeout.
    pub client_idle_timeout: Option<i64>,
    /// Offline client session max lifespan.
    pub offline_client_max_lifespan: Option<i64>,
    /// Offline client session idle timeout.
    pub offline_client_idle_timeout: Option<i64>,
}

/// A user session (SSO session).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    // === Identity ===
    /// Unique session identifier.
    pub id: Uuid,
    /// Realm this session belongs to.
    pub realm_id: Uuid,
    /// User who owns this session.
    pub user_id: Uuid,
    /// Whether this is an offline session.
    pub offline: bool,

    // === Login Info ===
    /// Username typed at login.
    pub login_username: String,
    /// IP address of the client.
    pub ip_address: Option<String>,
    /// Authentication method used.
    pub auth_method: Option<String>,
    /// Whether this session used "Remember Me".
    pub remember_me: bool,
    /// Broker session ID (for federated logins).
    pub broker_session_id: Option<String>,
    /// User id at the identity broker.
    pub broker_user_id: Option<String>,

    // === Session State ===
    /// Current state of the session.
    pub state: SessionState,
    /// Whether the session is stored.
    pub persistence_state: PersistenceState,

    // === Timestamps ===
    /// When the session was created.
    pub started: i64,
    /// Last time the session was refreshed.
    pub last_session_refresh: i64,
    /// Computed absolute expiry.
    pub expiration: i64,

    // === Expiration ===
    /// Session-level expiration overrides.
    pub expiration_overrides: ExpirationOverrides,

    // === Notes ===
    /// Session notes (key-value pairs for custom data).
    pub notes: HashMap<String, String>,

    // === Client Sessions ===
    /// Client sessions keyed by client id.
    pub client_sessions: HashMap<Uuid, AuthenticatedClientSession>,
}

impl UserSession {
    /// Creates a new online user session started at `now`.
    #[must_use]
    pub fn new(realm_id: Uuid, user_id: Uuid, login_username: impl Into<String>, now: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm_id,
            user_id,
            offline: false,
            login_username: login_username.into(),
            ip_address: None,
            auth_method: None,
            remember_me: false,
            broker_session_id: None,
            broker_user_id: None,
            state: SessionState::Active,
            persistence_state: PersistenceState::Persistent,
            started: now,
            last_session_refresh: now,
            expiration: now,
            expiration_overrides: ExpirationOverrides::default(),
            notes: HashMap::new(),
            client_sessions: HashMap::new(),
        }
    }

    /// Sets the session id.
    #[must_use]
    pub const fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Sets the remember me flag.
    #[must_use]
    pub const fn with_remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    /// Sets the IP address.
    #[must_use]
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth_method(mut self, method: impl Into<String>) -> Self {
        self.auth_method = Some(method.into());
        self
    }

    /// Sets the broker session and user ids.
    #[must_use]
    pub fn with_broker(
        mut self,
        broker_session_id: Option<String>,
        broker_user_id: Option<String>,
    ) -> Self {
        self.broker_session_id = broker_session_id;
        self.broker_user_id = broker_user_id;
        self
    }

    /// Sets the persistence state.
    #[must_use]
    pub const fn with_persistence_state(mut self, state: PersistenceState) -> Self {
        self.persistence_state = state;
        self
    }

    /// Gets a session note.
    #[must_use]
    pub fn get_note(&self, key: &str) -> Option<&str> {
        self.notes.get(key).map(String::as_str)
    }

    /// Id of the offline/online twin, if linked.
    #[must_use]
    pub fn corresponding_session_id(&self) -> Option<Uuid> {
        self.get_note(notes::CORRESPONDING_SESSION_ID)
            .and_then(|v| Uuid::parse_str(v).ok())
    }

    /// Checks if the session is transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.persistence_state == PersistenceState::Transient
    }

    /// Checks if the computed expiry lies at or before `now`.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.expiration <= now
    }

    /// Copies this session into an offline twin with a fresh id.
    ///
    /// Client sessions are not copied; they are attached individually.
    #[must_use]
    pub fn to_offline(&self, now: i64) -> Self {
        let mut offline = self.clone();
        offline.id = Uuid::now_v7();
        offline.offline = true;
        offline.persistence_state = PersistenceState::Persistent;
        offline.started = now;
        offline.last_session_refresh = now;
        offline.client_sessions = HashMap::new();
        offline
    }
}

/// A client session within a user session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedClientSession {
    // === Identity ===
    /// Unique client session identifier.
    pub id: Uuid,
    /// Client ID (internal `UUID`).
    pub client_id: Uuid,
    /// Whether the owning user session is offline.
    pub offline: bool,

    // === Timestamps ===
    /// When the client session was created.
    pub started: i64,
    /// Last refresh of this client session.
    pub timestamp: i64,
    /// Computed absolute expiry.
    pub expiration: i64,

    // === Protocol Info ===
    /// Protocol used (openid-connect, saml).
    pub protocol: Option<String>,
    /// Redirect URI used for this session.
    pub redirect_uri: Option<String>,
    /// Action being performed (if any).
    pub action: Option<String>,

    // === Token Info ===
    /// Current refresh token ID (for refresh token rotation).
    pub current_refresh_token: Option<String>,
    /// Current refresh token use count.
    pub current_refresh_token_use_count: i32,

    // === Notes ===
    /// Session notes (key-value pairs for custom data).
    pub notes: HashMap<String, String>,
}

impl AuthenticatedClientSession {
    /// Creates a new client session started at `now`.
    #[must_use]
    pub fn new(client_id: Uuid, offline: bool, now: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            client_id,
            offline,
            started: now,
            timestamp: now,
            expiration: now,
            protocol: None,
            redirect_uri: None,
            action: None,
            current_refresh_token: None,
            current_refresh_token_use_count: 0,
            notes: HashMap::new(),
        }
    }

    /// Copies this client session for the offline twin.
    #[must_use]
    pub fn to_offline(&self, now: i64) -> Self {
        let mut offline = self.clone();
        offline.id = Uuid::now_v7();
        offline.offline = true;
        offline.started = now;
        offline.timestamp = now;
        offline
    }
}

/// Well-known session note keys.
pub mod notes {
    /// Id of the offline/online twin of a session.
    pub const CORRESPONDING_SESSION_ID: &str = "correspondingSessionId";
    /// The client that initiated the authentication.
    pub const AUTH_CLIENT_ID: &str = "AUTH_CLIENT_ID";
}
