//! Per-request provider aggregate.

use std::sync::Arc;

use kc_provider::{
    ClientProvider, EventStoreProvider, LoginFailureProvider, RealmProvider, RoleProvider,
    SingleUseObjectProvider, UserProvider,
};
use kc_session::{AuthenticationSessionProvider, SessionResult, UserSessionProvider};
use kc_spi::{KeycloakSession, Provider};
use kc_storage::StorageResult;
use tracing::{debug, info};
use uuid::Uuid;

/// Every provider of one request, sharing one [`KeycloakSession`].
///
/// Providers are cheap handles; each accessor returns a fresh one bound to
/// the same unit of work. End the request with [`commit`](Self::commit) or
/// [`rollback`](Self::rollback).
#[derive(Debug, Clone)]
pub struct StoreSession {
    session: Arc<KeycloakSession>,
}

impl StoreSession {
    pub(crate) const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    /// The underlying unit of work.
    #[must_use]
    pub const fn session(&self) -> &Arc<KeycloakSession> {
        &self.session
    }

    /// Realm provider.
    #[must_use]
    pub fn realms(&self) -> RealmProvider {
        RealmProvider::new(Arc::clone(&self.session))
    }

    /// User provider.
    #[must_use]
    pub fn users(&self) -> UserProvider {
        UserProvider::new(Arc::clone(&self.session))
    }

    /// Client provider.
    #[must_use]
    pub fn clients(&self) -> ClientProvider {
        ClientProvider::new(Arc::clone(&self.session))
    }

    /// Role provider.
    #[must_use]
    pub fn roles(&self) -> RoleProvider {
        RoleProvider::new(Arc::clone(&self.session))
    }

    /// Login failure provider.
    #[must_use]
    pub fn login_failures(&self) -> LoginFailureProvider {
        LoginFailureProvider::new(Arc::clone(&self.session))
    }

    /// Single-use object provider.
    #[must_use]
    pub fn single_use_objects(&self) -> SingleUseObjectProvider {
        SingleUseObjectProvider::new(Arc::clone(&self.session))
    }

    /// Event store provider.
    #[must_use]
    pub fn events(&self) -> EventStoreProvider {
        EventStoreProvider::new(Arc::clone(&self.session))
    }

    /// User session provider.
    #[must_use]
    pub fn user_sessions(&self) -> UserSessionProvider {
        UserSessionProvider::new(Arc::clone(&self.session))
    }

    /// Authentication session provider.
    #[must_use]
    pub fn authentication_sessions(&self) -> AuthenticationSessionProvider {
        AuthenticationSessionProvider::new(Arc::clone(&self.session))
    }

    /// Removes a realm together with every session in it.
    ///
    /// # Errors
    ///
    /// Invalid state once the request ended, or store failure.
    pub async fn remove_realm(&self, realm_id: Uuid) -> SessionResult<bool> {
        self.user_sessions().on_realm_removed(realm_id).await?;
        self.authentication_sessions()
            .on_realm_removed(realm_id)
            .await?;
        let removed = self.realms().remove_realm(realm_id).await?;
        info!(%realm_id, removed, "realm removal finished");
        Ok(removed)
    }

    /// Removes a client and its sessions.
    ///
    /// # Errors
    ///
    /// Invalid state once the request ended, or store failure.
    pub async fn remove_client(&self, realm_id: Uuid, client_id: Uuid) -> SessionResult<bool> {
        if !self.clients().remove_client(realm_id, client_id).await? {
            return Ok(false);
        }
        self.user_sessions()
            .on_client_removed(realm_id, client_id)
            .await?;
        self.authentication_sessions()
            .on_client_removed(realm_id, client_id)
            .await?;
        debug!(%realm_id, %client_id, "client sessions removed");
        Ok(true)
    }

    /// Writes every pending change and ends the request.
    ///
    /// # Errors
    ///
    /// The first failing write; the request stays open for rollback.
    pub async fn commit(&self) -> StorageResult<()> {
        self.session.commit().await
    }

    /// Undoes the request's creations and ends it.
    ///
    /// # Errors
    ///
    /// The first failing compensation.
    pub async fn rollback(&self) -> StorageResult<()> {
        self.session.rollback().await
    }
}

impl Provider for StoreSession {
    fn close(&self) {
        if !self.session.is_closed() {
            debug!(session = %self.session.id(), "closing request without commit");
            self.session.repository().close();
        }
    }
}
