//! Single-use objects (action tokens, code-to-token data).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A globally keyed, short-lived object whose value is a note map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleUseObject {
    /// Global key.
    pub key: String,
    /// Absolute expiry (epoch seconds).
    pub expiration: i64,
    /// Payload.
    pub notes: HashMap<String, String>,
}

impl SingleUseObject {
    /// Creates an object expiring `lifespan_seconds` after `now`.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        lifespan_seconds: i64,
        notes: HashMap<String, String>,
        now: i64,
    ) -> Self {
        Self {
            key: key.into(),
            expiration: now.saturating_add(lifespan_seconds),
            notes,
        }
    }

    /// Checks if the object has expired at `now`.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.expiration <= now
    }
}
