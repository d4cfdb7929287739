//! Store settings.
//!
//! Settings are loaded from environment variables with sensible defaults.
//! A `.env` file in the working directory is read first when present.

use kc_core::Config;
use kc_core::config::AUTH_SESSIONS_LIMIT_KEY;
use kc_spi::MapConfig;
use kc_storage_column::ConnectionConfig;
use serde::{Deserialize, Serialize};

/// Provider options plus column-store connection parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Provider options.
    #[serde(default)]
    pub provider: Config,

    /// Connection parameters handed to the driver.
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl StoreSettings {
    /// Loads settings from `KC_AUTH_SESSIONS_LIMIT` and `KC_CASSANDRA_*`.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            provider: Config::from_env(),
            connection: ConnectionConfig::from_env(),
        }
    }

    /// Key/value form accepted by
    /// [`ProviderFactory::init`](kc_spi::ProviderFactory::init).
    #[must_use]
    pub fn factory_config(&self) -> MapConfig {
        MapConfig::new().with(
            AUTH_SESSIONS_LIMIT_KEY,
            self.provider.auth_sessions_limit.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use kc_spi::FactoryConfig;

    use super::*;

    #[test]
    fn factory_config_carries_limit() {
        let settings = StoreSettings {
            provider: Config::new().auth_sessions_limit(7),
            ..StoreSettings::default()
        };

        assert_eq!(settings.factory_config().get_int(AUTH_SESSIONS_LIMIT_KEY, 0), 7);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: StoreSettings =
            serde_json::from_str(r#"{"connection":{"keyspace":"sso"}}"#).unwrap();

        assert_eq!(settings.connection.keyspace, "sso");
        assert_eq!(settings.connection.port, ConnectionConfig::default().port);
        assert_eq!(settings.provider, Config::default());
    }
}
