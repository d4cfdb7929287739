//! Authentication session models.
//!
//! A [`RootAuthenticationSession`] groups the per-browser-tab
//! [`AuthenticationSession`]s of one login attempt. Children are keyed by tab id.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an authentication execution (step in the flow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Execution not yet started.
    #[default]
    NotStarted,
    /// Execution succeeded.
    Success,
    /// Execution was skipped.
    Skipped,
    /// Execution failed.
    Failed,
    /// Execution was challenged (waiting for user input).
    Challenged,
    /// User attempted but failed this execution.
    Attempted,
    /// Execution is being evaluated.
    Evaluated,
}

/// Root of the authentication sessions of one browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootAuthenticationSession {
    /// Unique identifier.
    pub id: Uuid,
    /// Realm ID.
    pub realm_id: Uuid,
    /// Last change of the root or any child (epoch seconds).
    pub timestamp: i64,
    /// Absolute expiry (epoch seconds).
    pub expiration: i64,
    /// Child sessions keyed by tab id.
    pub sessions: HashMap<String, AuthenticationSession>,
}

impl RootAuthenticationSession {
    /// Creates an empty root session.
    #[must_use]
    pub fn new(id: Uuid, realm_id: Uuid, now: i64) -> Self {
        Self {
            id,
            realm_id,
            timestamp: now,
            expiration: now,
            sessions: HashMap::new(),
        }
    }

    /// Tab id of the oldest child, ties broken by tab id.
    #[must_use]
    pub fn oldest_tab_id(&self) -> Option<&str> {
        self.sessions
            .values()
            .min_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then_with(|| a.tab_id.cmp(&b.tab_id))
            })
            .map(|s| s.tab_id.as_str())
    }
}

/// An authentication session for one browser tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationSession {
    /// Tab identifier, unique within the root.
    pub tab_id: String,
    /// Client that initiated the authentication.
    pub client_id: Uuid,
    /// Creation time or last restart (epoch seconds).
    pub timestamp: i64,
    /// Current action.
    pub action: Option<String>,
    /// Protocol (openid-connect, saml).
    pub protocol: Option<String>,
    /// Redirect URI for this authentication.
    pub redirect_uri: Option<String>,
    /// Execution status keyed by authenticator.
    pub execution_status: HashMap<String, ExecutionStatus>,
    /// User being authenticated (set after identification).
    pub authenticated_user_id: Option<Uuid>,
    /// Required actions that must be completed.
    pub required_actions: BTreeSet<String>,
    /// Requested client scopes.
    pub client_scopes: BTreeSet<String>,
    /// Notes passed between authenticators.
    pub auth_notes: HashMap<String, String>,
    /// Client notes (passed back to client in response).
    pub client_notes: HashMap<String, String>,
    /// User session notes (copied to the user session on success).
    pub user_session_notes: HashMap<String, String>,
}

impl AuthenticationSession {
    /// Creates a new child session.
    #[must_use]
    pub fn new(tab_id: impl Into<String>, client_id: Uuid, now: i64) -> Self {
        Self {
            tab_id: tab_id.into(),
            client_id,
            timestamp: now,
            action: None,
            protocol: None,
            redirect_uri: None,
            execution_status: HashMap::new(),
            authenticated_user_id: None,
            required_actions: BTreeSet::new(),
            client_scopes: BTreeSet::new(),
            auth_notes: HashMap::new(),
            client_notes: HashMap::new(),
            user_session_notes: HashMap::new(),
        }
    }

    /// Clears all progress, keeping identity and client.
    pub fn restart(&mut self, now: i64) {
        *self = Self::new(std::mem::take(&mut self.tab_id), self.client_id, now);
    }
}
