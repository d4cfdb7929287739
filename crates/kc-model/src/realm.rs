//! Realm domain model.
//!
//! A realm is the tenant that partitions every other entity. Besides its identity it
//! carries the defaults the session expiration engine starts from.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Keycloak realm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)] // Domain model naturally has many boolean flags
pub struct Realm {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Unique realm name.
    pub name: String,
    /// Display name for UI.
    pub display_name: Option<String>,
    /// Whether the realm is enabled.
    pub enabled: bool,

    // === Timestamps ===
    /// When the realm was created.
    pub created_at: DateTime<Utc>,
    /// When the realm was last updated.
    pub updated_at: DateTime<Utc>,

    // === Login Settings ===
    /// Allow duplicate email addresses.
    pub duplicate_emails_allowed: bool,
    /// Enable "Remember Me" checkbox.
    pub remember_me: bool,

    // === Code Lifespans (seconds) ===
    /// Authorization code lifespan.
    pub access_code_lifespan: i32,
    /// User action code lifespan.
    pub access_code_lifespan_user_action: i32,
    /// Login flow code lifespan.
    pub access_code_lifespan_login: i32,

    // === Session Lifespans (seconds) ===
    /// SSO session idle timeout.
    pub sso_session_idle_timeout: i32,
    /// SSO session max lifespan.
    pub sso_session_max_lifespan: i32,
    /// SSO session idle timeout with "Remember Me" (0 falls back to the plain value).
    pub sso_session_idle_timeout_remember_me: i32,
    /// SSO session max lifespan with "Remember Me" (0 falls back to the plain value).
    pub sso_session_max_lifespan_remember_me: i32,
    /// Offline session idle timeout.
    pub offline_session_idle_timeout: i32,
    /// Whether offline sessions have a max lifespan at all.
    pub offline_session_max_lifespan_enabled: bool,
    /// Offline session max lifespan.
    pub offline_session_max_lifespan: i32,
    /// Client session idle timeout (0 falls back to the SSO value).
    pub client_session_idle_timeout: i32,
    /// Client session max lifespan (0 falls back to the SSO value).
    pub client_session_max_lifespan: i32,
    /// Offline client session idle timeout (0 falls back to the offline value).
    pub client_offline_session_idle_timeout: i32,
    /// Offline client session max lifespan (0 falls back to the offline value).
    pub client_offline_session_max_lifespan: i32,

    // === Events ===
    /// Enable event storage.
    pub events_enabled: bool,
    /// Event expiration time (seconds, 0 keeps events forever).
    pub events_expiration: i64,

    // === Custom Attributes ===
    /// Custom realm attributes.
    pub attributes: HashMap<String, Vec<String>>,
}

impl Realm {
    /// Creates a new realm with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::now_v7(), name)
    }

    /// Creates a new realm with a caller-supplied id.
    #[must_use]
    pub fn with_id(id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            display_name: None,
            enabled: true,
            created_at: now,
            updated_at: now,
            duplicate_emails_allowed: false,
            remember_me: false,
            access_code_lifespan: 60,               // 1 minute
            access_code_lifespan_user_action: 300,  // 5 minutes
            access_code_lifespan_login: 1800,       // 30 minutes
            sso_session_idle_timeout: 1800,         // 30 minutes
            sso_session_max_lifespan: 36000,        // 10 hours
            sso_session_idle_timeout_remember_me: 0,
            sso_session_max_lifespan_remember_me: 0,
            offline_session_idle_timeout: 2_592_000, // 30 days
            offline_session_max_lifespan_enabled: false,
            offline_session_max_lifespan: 5_184_000, // 60 days
            client_session_idle_timeout: 0,
            client_session_max_lifespan: 0,
            client_offline_session_idle_timeout: 0,
            client_offline_session_max_lifespan: 0,
            events_enabled: false,
            events_expiration: 0,
            attributes: HashMap::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the SSO session timeouts.
    #[must_use]
    pub const fn with_sso_session(mut self, idle_timeout: i32, max_lifespan: i32) -> Self {
        self.sso_session_idle_timeout = idle_timeout;
        self.sso_session_max_lifespan = max_lifespan;
        self
    }

    /// Lifespan of an authentication session: the longest of the code lifespans.
    #[must_use]
    pub fn auth_session_lifespan(&self) -> i32 {
        self.access_code_lifespan
            .max(self.access_code_lifespan_user_action)
            .max(self.access_code_lifespan_login)
    }

    /// Gets the first value of an attribute.
    #[must_use]
    pub fn get_first_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Checks if the realm is the master realm.
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.name == "master"
    }
}
