//! Brute-force protection record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failed login bookkeeping for one user in one realm.
///
/// Keyed by `(realm_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFailure {
    /// Realm ID.
    pub realm_id: Uuid,
    /// User ID.
    pub user_id: Uuid,
    /// Epoch millis before which logins are refused.
    pub failed_login_not_before: i64,
    /// Number of consecutive failures.
    pub num_failures: i32,
    /// Number of temporary lockouts issued.
    pub num_temporary_lockouts: i32,
    /// Epoch millis of the last failure.
    pub last_failure: i64,
    /// IP address of the last failure.
    pub last_ip_failure: Option<String>,
}

impl LoginFailure {
    /// Creates an empty record.
    #[must_use]
    pub const fn new(realm_id: Uuid, user_id: Uuid) -> Self {
        Self {
            realm_id,
            user_id,
            failed_login_not_before: 0,
            num_failures: 0,
            num_temporary_lockouts: 0,
            last_failure: 0,
            last_ip_failure: None,
        }
    }

    /// Resets every counter.
    pub fn clear(&mut self) {
        *self = Self::new(self.realm_id, self.user_id);
    }
}
