//! Compensation log of a request.
//!
//! Creations are written to the store straight away so duplicates surface
//! at the call site. Each creation records an undo action here; rollback
//! runs them newest first.

use async_trait::async_trait;
use kc_model::{Client, Realm, Role, User, UserSession};
use kc_repository::CompositeRepository;
use kc_storage::StorageResult;
use parking_lot::Mutex;
use uuid::Uuid;

/// An action undoing a store write.
#[async_trait]
pub trait Compensation: Send + Sync + std::fmt::Debug {
    /// Reverts the write.
    ///
    /// # Errors
    ///
    /// Store failure.
    async fn compensate(&self, repo: &CompositeRepository) -> StorageResult<()>;
}

/// Deletes an entity created earlier in the request.
#[derive(Debug, Clone)]
pub enum UndoCreate {
    /// Created realm.
    Realm(Realm),
    /// Created user.
    User(User),
    /// Created client.
    Client(Client),
    /// Created role.
    Role(Role),
    /// Created user session, online or offline.
    UserSession(UserSession),
    /// Created root authentication session.
    RootAuthSession {
        /// Realm ID.
        realm_id: Uuid,
        /// Root session ID.
        id: Uuid,
    },
    /// Created login failure record.
    LoginFailure {
        /// Realm ID.
        realm_id: Uuid,
        /// User ID.
        user_id: Uuid,
    },
}

#[async_trait]
impl Compensation for UndoCreate {
    async fn compensate(&self, repo: &CompositeRepository) -> StorageResult<()> {
        match self {
            Self::Realm(realm) => repo.delete_realm(realm).await.map(drop),
            Self::User(user) => repo.delete_user(user).await.map(drop),
            Self::Client(client) => repo.delete_client(client).await.map(drop),
            Self::Role(role) => repo.delete_role(role).await.map(drop),
            Self::UserSession(session) => repo.delete_user_session(session).await.map(drop),
            Self::RootAuthSession { realm_id, id } => repo
                .delete_root_auth_session(*realm_id, *id)
                .await
                .map(drop),
            Self::LoginFailure { realm_id, user_id } => repo
                .delete_login_failure(*realm_id, *user_id)
                .await
                .map(drop),
        }
    }
}

/// Compensations registered in the current request.
#[derive(Debug, Default)]
pub struct Transaction {
    compensations: Mutex<Vec<Box<dyn Compensation>>>,
}

impl Transaction {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an undo action.
    pub fn register(&self, compensation: impl Compensation + 'static) {
        self.compensations.lock().push(Box::new(compensation));
    }

    /// Number of recorded actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.compensations.lock().len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes every action, newest first.
    pub fn take_reversed(&self) -> Vec<Box<dyn Compensation>> {
        let mut taken = std::mem::take(&mut *self.compensations.lock());
        taken.reverse();
        taken
    }

    /// Forgets every action.
    pub fn clear(&self) {
        self.compensations.lock().clear();
    }
}
