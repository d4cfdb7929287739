//! Client session view.

use std::collections::HashMap;
use std::sync::Arc;

use kc_model::AuthenticatedClientSession;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::user_session::UserSessionAdapter;

/// One client's session inside a [`UserSessionAdapter`].
///
/// Reads return `None` once the client session was detached or pruned;
/// writes fail with an invalid-state error.
#[derive(Debug, Clone)]
pub struct ClientSessionAdapter {
    parent: Arc<UserSessionAdapter>,
    client_id: Uuid,
}

impl ClientSessionAdapter {
    pub(crate) const fn new(parent: Arc<UserSessionAdapter>, client_id: Uuid) -> Self {
        Self { parent, client_id }
    }

    fn read<R>(&self, f: impl FnOnce(&AuthenticatedClientSession) -> R) -> Option<R> {
        self.parent.read_client_session(self.client_id, f)
    }

    fn modify(&self, f: impl FnOnce(&mut AuthenticatedClientSession)) -> SessionResult<()> {
        if self.parent.modify_client_session(self.client_id, f)? {
            Ok(())
        } else {
            Err(SessionError::Invalid(format!(
                "client session of client {} is no longer attached",
                self.client_id
            )))
        }
    }

    /// Client ID.
    #[must_use]
    pub const fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Owning user session.
    #[must_use]
    pub const fn user_session(&self) -> &Arc<UserSessionAdapter> {
        &self.parent
    }

    /// Clones the client session.
    #[must_use]
    pub fn entity(&self) -> Option<AuthenticatedClientSession> {
        self.read(AuthenticatedClientSession::clone)
    }

    /// Client session ID.
    #[must_use]
    pub fn id(&self) -> Option<Uuid> {
        self.read(|cs| cs.id)
    }

    /// Whether the client session is offline.
    #[must_use]
    pub fn is_offline(&self) -> Option<bool> {
        self.read(|cs| cs.offline)
    }

    /// Start time (epoch seconds).
    #[must_use]
    pub fn started(&self) -> Option<i64> {
        self.read(|cs| cs.started)
    }

    /// Last refresh (epoch seconds).
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        self.read(|cs| cs.timestamp)
    }

    /// Computed expiry (epoch seconds).
    #[must_use]
    pub fn expiration(&self) -> Option<i64> {
        self.read(|cs| cs.expiration)
    }

    /// Current action.
    #[must_use]
    pub fn action(&self) -> Option<String> {
        self.read(|cs| cs.action.clone()).flatten()
    }

    /// Protocol.
    #[must_use]
    pub fn protocol(&self) -> Option<String> {
        self.read(|cs| cs.protocol.clone()).flatten()
    }

    /// Redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<String> {
        self.read(|cs| cs.redirect_uri.clone()).flatten()
    }

    /// Gets a note.
    #[must_use]
    pub fn note(&self, key: &str) -> Option<String> {
        self.read(|cs| cs.notes.get(key).cloned()).flatten()
    }

    /// All notes.
    #[must_use]
    pub fn notes(&self) -> HashMap<String, String> {
        self.read(|cs| cs.notes.clone()).unwrap_or_default()
    }

    /// Current refresh token ID.
    #[must_use]
    pub fn current_refresh_token(&self) -> Option<String> {
        self.read(|cs| cs.current_refresh_token.clone()).flatten()
    }

    /// Uses of the current refresh token.
    #[must_use]
    pub fn current_refresh_token_use_count(&self) -> Option<i32> {
        self.read(|cs| cs.current_refresh_token_use_count)
    }

    /// Records a refresh and recomputes the expiry.
    pub fn set_timestamp(&self, seconds: i64) -> SessionResult<()> {
        self.modify(|cs| cs.timestamp = seconds)
    }

    /// Sets the current action.
    pub fn set_action(&self, action: Option<String>) -> SessionResult<()> {
        self.modify(|cs| cs.action = action)
    }

    /// Sets the protocol.
    pub fn set_protocol(&self, protocol: impl Into<String>) -> SessionResult<()> {
        let protocol = protocol.into();
        self.modify(|cs| cs.protocol = Some(protocol))
    }

    /// Sets the redirect URI.
    pub fn set_redirect_uri(&self, uri: impl Into<String>) -> SessionResult<()> {
        let uri = uri.into();
        self.modify(|cs| cs.redirect_uri = Some(uri))
    }

    /// Sets a note.
    pub fn set_note(&self, key: impl Into<String>, value: impl Into<String>) -> SessionResult<()> {
        let (key, value) = (key.into(), value.into());
        self.modify(|cs| {
            cs.notes.insert(key, value);
        })
    }

    /// Removes a note.
    pub fn remove_note(&self, key: &str) -> SessionResult<()> {
        self.modify(|cs| {
            cs.notes.remove(key);
        })
    }

    /// Records a new refresh token, resetting its use count.
    pub fn set_current_refresh_token(&self, token_id: impl Into<String>) -> SessionResult<()> {
        let token_id = token_id.into();
        self.modify(|cs| {
            cs.current_refresh_token = Some(token_id);
            cs.current_refresh_token_use_count = 0;
        })
    }

    /// Counts one more use of the current refresh token.
    pub fn increment_refresh_token_use_count(&self) -> SessionResult<()> {
        self.modify(|cs| cs.current_refresh_token_use_count += 1)
    }

    /// Removes this client session from its user session.
    pub fn detach(&self) -> SessionResult<()> {
        self.parent
            .remove_authenticated_client_sessions([self.client_id])?;
        Ok(())
    }
}
