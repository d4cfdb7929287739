//! Column-store connection configuration.
//!
//! These values are handed to the driver verbatim; nothing in the entity
//! stores interprets them.

use serde::{Deserialize, Serialize};

/// Connection parameters for the column store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Contact points (host names or addresses).
    #[serde(default = "default_contact_points")]
    pub contact_points: Vec<String>,
    /// Native protocol port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username (optional).
    pub username: Option<String>,
    /// Password (optional).
    pub password: Option<String>,
    /// Keyspace holding every table.
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    /// Replication factor used when the keyspace is created.
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
    /// Datacenter preferred by the load balancing policy.
    #[serde(default = "default_local_datacenter")]
    pub local_datacenter: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            contact_points: default_contact_points(),
            port: default_port(),
            username: None,
            password: None,
            keyspace: default_keyspace(),
            replication_factor: default_replication_factor(),
            local_datacenter: default_local_datacenter(),
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the contact points.
    #[must_use]
    pub fn contact_points(mut self, points: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.contact_points = points.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the keyspace.
    #[must_use]
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    /// Sets the replication factor.
    #[must_use]
    pub const fn replication_factor(mut self, factor: u32) -> Self {
        self.replication_factor = factor;
        self
    }

    /// Sets the local datacenter.
    #[must_use]
    pub fn local_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.local_datacenter = datacenter.into();
        self
    }

    /// Loads configuration from `KC_CASSANDRA_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparsable numbers are ignored
    /// with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(points) = lookup("KC_CASSANDRA_CONTACT_POINTS") {
            let points: Vec<String> = points
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
            if !points.is_empty() {
                config.contact_points = points;
            }
        }
        if let Some(port) = parse_var(&lookup, "KC_CASSANDRA_PORT") {
            config.port = port;
        }
        config.username = lookup("KC_CASSANDRA_USERNAME").or(config.username);
        config.password = lookup("KC_CASSANDRA_PASSWORD").or(config.password);
        if let Some(keyspace) = lookup("KC_CASSANDRA_KEYSPACE") {
            config.keyspace = keyspace;
        }
        if let Some(factor) = parse_var(&lookup, "KC_CASSANDRA_REPLICATION_FACTOR") {
            config.replication_factor = factor;
        }
        if let Some(datacenter) = lookup("KC_CASSANDRA_LOCAL_DATACENTER") {
            config.local_datacenter = datacenter;
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "ignoring invalid column store setting");
    }
    parsed
}

fn default_contact_points() -> Vec<String> {
    vec!["localhost".to_string()]
}

const fn default_port() -> u16 {
    9042
}

fn default_keyspace() -> String {
    "keycloak".to_string()
}

const fn default_replication_factor() -> u32 {
    1
}

fn default_local_datacenter() -> String {
    "datacenter1".to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults() {
        let config = ConnectionConfig::new();
        assert_eq!(config.contact_points, vec!["localhost".to_string()]);
        assert_eq!(config.port, 9042);
        assert_eq!(config.keyspace, "keycloak");
        assert_eq!(config.replication_factor, 1);
    }

    #[test]
    fn builder_overrides() {
        let config = ConnectionConfig::new()
            .contact_points(["cass-1", "cass-2"])
            .port(19042)
            .credentials("kc", "secret")
            .keyspace("identity")
            .replication_factor(3);

        assert_eq!(config.contact_points.len(), 2);
        assert_eq!(config.port, 19042);
        assert_eq!(config.username.as_deref(), Some("kc"));
        assert_eq!(config.keyspace, "identity");
        assert_eq!(config.replication_factor, 3);
    }

    #[test]
    fn lookup_parses_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("KC_CASSANDRA_CONTACT_POINTS", "a, b ,,c"),
            ("KC_CASSANDRA_PORT", "not-a-port"),
            ("KC_CASSANDRA_REPLICATION_FACTOR", "3"),
            ("KC_CASSANDRA_KEYSPACE", "ks"),
        ]
        .into_iter()
        .collect();

        let config = ConnectionConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.contact_points, vec!["a", "b", "c"]);
        assert_eq!(config.port, 9042);
        assert_eq!(config.replication_factor, 3);
        assert_eq!(config.keyspace, "ks");
    }
}
