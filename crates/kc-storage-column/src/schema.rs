//! Table names and CQL schema.
//!
//! Every table uses the same `(partition_key, clustering_key) -> value`
//! layout. Index tables hold the id of the primary row as their value.

use crate::config::ConnectionConfig;

/// Realms, all in one partition.
pub const REALMS: &str = "realms";
/// Realm name index.
pub const REALMS_BY_NAME: &str = "realms_by_name";
/// Users, partitioned by realm.
pub const USERS: &str = "users";
/// Username index.
pub const USERS_BY_USERNAME: &str = "users_by_username";
/// Email index.
pub const USERS_BY_EMAIL: &str = "users_by_email";
/// Federation link index.
pub const USERS_BY_FEDERATION_LINK: &str = "users_by_federation_link";
/// Service account link index.
pub const USERS_BY_SERVICE_ACCOUNT: &str = "users_by_service_account";
/// Attribute value index.
pub const USERS_BY_ATTRIBUTE: &str = "users_by_attribute";
/// Clients, partitioned by realm.
pub const CLIENTS: &str = "clients";
/// `client_id` index.
pub const CLIENTS_BY_CLIENT_ID: &str = "clients_by_client_id";
/// Roles, partitioned by realm.
pub const ROLES: &str = "roles";
/// Role name index, scoped by container.
pub const ROLES_BY_NAME: &str = "roles_by_name";
/// User sessions, partitioned by realm.
pub const USER_SESSIONS: &str = "user_sessions";
/// Sessions by user.
pub const USER_SESSIONS_BY_USER: &str = "user_sessions_by_user";
/// Sessions by broker session id.
pub const USER_SESSIONS_BY_BROKER_SESSION: &str = "user_sessions_by_broker_session";
/// Sessions by broker user id.
pub const USER_SESSIONS_BY_BROKER_USER: &str = "user_sessions_by_broker_user";
/// Sessions by client.
pub const USER_SESSIONS_BY_CLIENT: &str = "user_sessions_by_client";
/// Root authentication sessions, partitioned by realm.
pub const AUTH_SESSIONS: &str = "auth_sessions";
/// Login failures, partitioned by realm.
pub const LOGIN_FAILURES: &str = "login_failures";
/// Single-use objects, partitioned by key.
pub const SINGLE_USE_OBJECTS: &str = "single_use_objects";
/// Events, partitioned by realm.
pub const EVENTS: &str = "events";

/// Every table of the keyspace.
pub const TABLES: &[&str] = &[
    REALMS,
    REALMS_BY_NAME,
    USERS,
    USERS_BY_USERNAME,
    USERS_BY_EMAIL,
    USERS_BY_FEDERATION_LINK,
    USERS_BY_SERVICE_ACCOUNT,
    USERS_BY_ATTRIBUTE,
    CLIENTS,
    CLIENTS_BY_CLIENT_ID,
    ROLES,
    ROLES_BY_NAME,
    USER_SESSIONS,
    USER_SESSIONS_BY_USER,
    USER_SESSIONS_BY_BROKER_SESSION,
    USER_SESSIONS_BY_BROKER_USER,
    USER_SESSIONS_BY_CLIENT,
    AUTH_SESSIONS,
    LOGIN_FAILURES,
    SINGLE_USE_OBJECTS,
    EVENTS,
];

/// CQL statements creating the keyspace and every table.
#[must_use]
pub fn create_statements(config: &ConnectionConfig) -> Vec<String> {
    let keyspace = &config.keyspace;
    let mut statements = vec![format!(
        "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH replication = \
         {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        config.replication_factor
    )];
    statements.extend(TABLES.iter().map(|table| {
        format!(
            "CREATE TABLE IF NOT EXISTS {keyspace}.{table} (\
             partition_key text, clustering_key text, value blob, \
             PRIMARY KEY ((partition_key), clustering_key))"
        )
    }));
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_cover_keyspace_and_tables() {
        let config = ConnectionConfig::new().keyspace("kc").replication_factor(3);
        let statements = create_statements(&config);

        assert_eq!(statements.len(), TABLES.len() + 1);
        assert!(statements[0].contains("'replication_factor': 3"));
        assert!(
            statements
                .iter()
                .any(|s| s.contains("kc.user_sessions_by_client ("))
        );
    }
}
