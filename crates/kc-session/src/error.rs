//! Session error types.

use kc_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Parent user session no longer exists.
    #[error("User session not found: {0}")]
    UserSessionNotFound(Uuid),

    /// Client referenced by a session does not exist.
    #[error("Client not found: {0}")]
    ClientNotFound(Uuid),

    /// Realm referenced by a session does not exist.
    #[error("Realm not found: {0}")]
    RealmNotFound(Uuid),

    /// Authentication session was evicted or removed.
    #[error("Authentication session not found for tab: {0}")]
    AuthSessionNotFound(String),

    /// Operation does not fit the session, e.g. an offline client session
    /// on an online parent.
    #[error("Session invalid: {0}")]
    Invalid(String),
}

impl SessionError {
    /// Checks if the operation was rejected because of missing or
    /// discarded state.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_invalid_state(),
            _ => true,
        }
    }

    /// Checks if this is a uniqueness violation.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_duplicate())
    }

    /// Checks if the store failed.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_store_failure())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(SessionError::ClientNotFound(Uuid::now_v7()).is_invalid_state());
        assert!(SessionError::from(StorageError::invalid_state("gone")).is_invalid_state());
        assert!(SessionError::from(StorageError::store("timeout")).is_store_failure());
        assert!(!SessionError::from(StorageError::store("timeout")).is_invalid_state());
        assert!(
            SessionError::from(StorageError::duplicate("User", "username", "alice")).is_duplicate()
        );
    }
}
