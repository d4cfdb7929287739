//! Client domain model.
//!
//! Clients represent applications that can request authentication
//! and authorization from Keycloak. Besides identity and protocol settings
//! a client may carry attributes that tighten session lifespans for the
//! sessions it participates in.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client attribute: idle timeout of online client sessions (seconds).
pub const CLIENT_SESSION_IDLE_TIMEOUT: &str = "client.session.idle.timeout";
/// Client attribute: max lifespan of online client sessions (seconds).
pub const CLIENT_SESSION_MAX_LIFESPAN: &str = "client.session.max.lifespan";
/// Client attribute: idle timeout of offline client sessions (seconds).
pub const CLIENT_OFFLINE_SESSION_IDLE_TIMEOUT: &str = "client.offline.session.idle.timeout";
/// Client attribute: max lifespan of offline client sessions (seconds).
pub const CLIENT_OFFLINE_SESSION_MAX_LIFESPAN: &str = "client.offline.session.max.lifespan";

/// Protocol type for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// `OpenID` Connect protocol.
    #[default]
    OpenidConnect,
    /// SAML 2.0 protocol.
    Saml,
}

impl Protocol {
    /// Wire name of the protocol, as stored on sessions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenidConnect => "openid-connect",
            Self::Saml => "saml",
        }
    }
}

/// A Keycloak client (OAuth 2.0 / OIDC application).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this client belongs to.
    pub realm_id: Uuid,
    /// Unique client identifier (OAuth `client_id`).
    pub client_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Whether the client is enabled.
    pub enabled: bool,

    // === Timestamps ===
    /// When the client was created.
    pub created_at: DateTime<Utc>,
    /// When the client was last updated.
    pub updated_at: DateTime<Utc>,

    // === Protocol ===
    /// Protocol type (OIDC or SAML).
    pub protocol: Protocol,
    /// Client secret (for confidential clients).
    pub secret: Option<String>,
    /// Whether this is a public client.
    pub public_client: bool,

    // === URLs ===
    /// Allowed redirect URIs.
    pub redirect_uris: HashSet<String>,
    /// Allowed web origins (CORS).
    pub web_origins: HashSet<String>,

    // === Custom Attributes ===
    /// Custom client attributes.
    pub attributes: HashMap<String, String>,
}

impl Client {
    /// Creates a new client with the given client ID.
    #[must_use]
    pub fn new(realm_id: Uuid, client_id: impl Into<String>) -> Self {
        Self::with_id(Uuid::now_v7(), realm_id, client_id)
    }

    /// Creates a new client with a caller-supplied id.
    #[must_use]
    pub fn with_id(id: Uuid, realm_id: Uuid, client_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            realm_id,
            client_id: client_id.into(),
            name: None,
            description: None,
            enabled: true,
            created_at: now,
            updated_at: now,
            protocol: Protocol::default(),
            secret: None,
            public_client: false,
            redirect_uris: HashSet::new(),
            web_origins: HashSet::new(),
            attributes: HashMap::new(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets a custom attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Reads an attribute as a number of seconds.
    ///
    /// Missing, unparsable and non-positive values read as `None`.
    #[must_use]
    pub fn attribute_seconds(&self, name: &str) -> Option<i64> {
        self.attributes
            .get(name)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
    }
}
