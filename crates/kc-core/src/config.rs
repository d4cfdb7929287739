//! Provider configuration.
//!
//! Options are resolved when the provider factory is initialized and stay fixed for the
//! lifetime of the factory. Connection parameters for the column store are kept in
//! `kc-storage-column` and handed to the driver untouched.

use serde::{Deserialize, Serialize};

/// Default maximum number of authentication sessions per root session.
pub const DEFAULT_AUTH_SESSIONS_LIMIT: usize = 300;

/// Factory configuration key for the auth-session limit.
pub const AUTH_SESSIONS_LIMIT_KEY: &str = "authSessionsLimit";

/// Environment variable for the auth-session limit.
pub const AUTH_SESSIONS_LIMIT_ENV: &str = "KC_AUTH_SESSIONS_LIMIT";

/// Provider options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of authentication sessions (browser tabs) per root session.
    #[serde(default = "default_auth_sessions_limit")]
    pub auth_sessions_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_sessions_limit: DEFAULT_AUTH_SESSIONS_LIMIT,
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the auth-session limit.
    ///
    /// A zero limit falls back to [`DEFAULT_AUTH_SESSIONS_LIMIT`].
    #[must_use]
    pub const fn auth_sessions_limit(mut self, limit: usize) -> Self {
        self.auth_sessions_limit = if limit == 0 {
            DEFAULT_AUTH_SESSIONS_LIMIT
        } else {
            limit
        };
        self
    }

    /// Loads configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let raw = std::env::var(AUTH_SESSIONS_LIMIT_ENV).ok();
        Self {
            auth_sessions_limit: resolve_auth_sessions_limit(raw.as_deref()),
        }
    }
}

/// Resolves a raw auth-session limit value.
///
/// Missing, unparsable and non-positive values fall back to the default.
#[must_use]
pub fn resolve_auth_sessions_limit(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_AUTH_SESSIONS_LIMIT;
    };

    match raw.trim().parse::<i64>() {
        Ok(limit) if limit > 0 => usize::try_from(limit).unwrap_or(DEFAULT_AUTH_SESSIONS_LIMIT),
        Ok(limit) => {
            tracing::warn!(limit, "non-positive auth sessions limit, using default");
            DEFAULT_AUTH_SESSIONS_LIMIT
        }
        Err(_) => {
            tracing::warn!(value = raw, "invalid auth sessions limit, using default");
            DEFAULT_AUTH_SESSIONS_LIMIT
        }
    }
}

const fn default_auth_sessions_limit() -> usize {
    DEFAULT_AUTH_SESSIONS_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit() {
        assert_eq!(Config::default().auth_sessions_limit, 300);
        assert_eq!(resolve_auth_sessions_limit(None), 300);
    }

    #[test]
    fn invalid_limits_fall_back() {
        assert_eq!(resolve_auth_sessions_limit(Some("0")), 300);
        assert_eq!(resolve_auth_sessions_limit(Some("-5")), 300);
        assert_eq!(resolve_auth_sessions_limit(Some("lots")), 300);
        assert_eq!(resolve_auth_sessions_limit(Some(" 12 ")), 12);
    }

    #[test]
    fn builder_rejects_zero() {
        assert_eq!(Config::new().auth_sessions_limit(0).auth_sessions_limit, 300);
        assert_eq!(Config::new().auth_sessions_limit(2).auth_sessions_limit, 2);
    }

    #[test]
    fn missing_field_deserializes_to_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.auth_sessions_limit, DEFAULT_AUTH_SESSIONS_LIMIT);
    }
}
