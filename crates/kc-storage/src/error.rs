//! Storage error types.
//!
//! Not-found is never an error: lookups return `Option`, empty collections
//! or `false`. What remains is the taxonomy the callers branch on.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Duplicate entity (unique constraint violation).
    #[error("Duplicate {entity_type}: {field} '{value}' already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Field that caused the conflict.
        field: &'static str,
        /// Conflicting value.
        value: String,
    },

    /// Operation on a discarded entity or against a missing parent.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The column store failed.
    #[error("Store failure: {0}")]
    Store(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(
        entity_type: &'static str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::Duplicate {
            entity_type,
            field,
            value: value.into(),
        }
    }

    /// Creates an invalid state error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Creates a store failure.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Checks if this is a duplicate error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Checks if this is an invalid state error.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Checks if this error came from the store itself.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Serialization(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_error() {
        let err = StorageError::duplicate("User", "username", "john");

        assert!(err.is_duplicate());
        assert!(!err.is_invalid_state());
        assert!(err.to_string().contains("john"));
    }

    #[test]
    fn store_failure_predicates() {
        assert!(StorageError::store("timeout").is_store_failure());
        assert!(StorageError::Serialization("bad json".into()).is_store_failure());
        assert!(!StorageError::invalid_state("discarded").is_store_failure());
    }
}
