//! Login and account events.
//!
//! Events are stored per realm when the realm enables them and are
//! queried by type, user, client and time window.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Authentication events
    /// User login.
    Login,
    /// User login failed.
    LoginError,
    /// User logout.
    Logout,
    /// Logout failed.
    LogoutError,
    /// Token refresh.
    RefreshToken,
    /// Token refresh failed.
    RefreshTokenError,
    /// Authorization code exchanged for tokens.
    CodeToToken,
    /// Code exchange failed.
    CodeToTokenError,

    // Account events
    /// User registered.
    Register,
    /// User profile updated.
    UpdateProfile,
    /// Password updated.
    UpdatePassword,
    /// Password reset requested.
    ResetPassword,

    // Session events
    /// Offline token issued.
    OfflineToken,
    /// Grant revoked.
    RevokeGrant,
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// Epoch millis of the event.
    pub time: i64,
    /// Type of event.
    pub event_type: EventType,
    /// Realm ID where the event occurred.
    pub realm_id: Uuid,
    /// Client ID (OAuth `client_id`) associated with the event.
    pub client_id: Option<String>,
    /// User ID associated with the event.
    pub user_id: Option<Uuid>,
    /// User session ID.
    pub session_id: Option<Uuid>,
    /// Source IP address.
    pub ip_address: Option<String>,
    /// Error code (for error events).
    pub error: Option<String>,
    /// Additional details.
    pub details: BTreeMap<String, String>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType, realm_id: Uuid) -> EventBuilder {
        EventBuilder::new(event_type, realm_id)
    }
}

/// Builder for creating events.
#[derive(Debug)]
pub struct EventBuilder {
    event_type: EventType,
    realm_id: Uuid,
    client_id: Option<String>,
    user_id: Option<Uuid>,
    session_id: Option<Uuid>,
    ip_address: Option<String>,
    error: Option<String>,
    details: BTreeMap<String, String>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType, realm_id: Uuid) -> Self {
        Self {
            event_type,
            realm_id,
            client_id: None,
            user_id: None,
            session_id: None,
            ip_address: None,
            error: None,
            details: BTreeMap::new(),
        }
    }

    /// Sets the user ID.
    #[must_use]
    pub const fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the session ID.
    #[must_use]
    pub const fn session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Sets the IP address.
    #[must_use]
    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Sets the error code.
    #[must_use]
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Builds the event at the given epoch millis.
    #[must_use]
    pub fn build(self, time: i64) -> Event {
        Event {
            id: Uuid::now_v7(),
            time,
            event_type: self.event_type,
            realm_id: self.realm_id,
            client_id: self.client_id,
            user_id: self.user_id,
            session_id: self.session_id,
            ip_address: self.ip_address,
            error: self.error,
            details: self.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let realm_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();

        let event = Event::builder(EventType::LoginError, realm_id)
            .user(user_id)
            .client("app")
            .ip_address("192.168.1.1")
            .error("invalid_user_credentials")
            .detail("username", "alice")
            .build(42_000);

        assert_eq!(event.event_type, EventType::LoginError);
        assert_eq!(event.realm_id, realm_id);
        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.client_id.as_deref(), Some("app"));
        assert_eq!(event.error.as_deref(), Some("invalid_user_credentials"));
        assert_eq!(event.details.get("username").map(String::as_str), Some("alice"));
        assert_eq!(event.time, 42_000);
    }

    #[test]
    fn event_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&EventType::CodeToTokenError).unwrap();
        assert_eq!(json, "\"CODE_TO_TOKEN_ERROR\"");
    }
}
