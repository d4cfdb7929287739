//! Cache tags of every repository operation.

use kc_cache::{CacheTag, caches};

// === Realms ===
pub const CREATE_REALM: CacheTag = CacheTag::write(caches::REALMS, "create_realm");
pub const UPDATE_REALM: CacheTag = CacheTag::write(caches::REALMS, "update_realm");
pub const DELETE_REALM: CacheTag = CacheTag::write(caches::REALMS, "delete_realm");
pub const GET_REALM: CacheTag = CacheTag::read(caches::REALMS, "get_realm");
pub const GET_REALM_BY_NAME: CacheTag = CacheTag::read(caches::REALMS, "get_realm_by_name");
pub const LIST_REALMS: CacheTag = CacheTag::read(caches::REALMS, "list_realms");

// === Users ===
pub const CREATE_USER: CacheTag = CacheTag::write(caches::USERS, "create_user");
pub const UPDATE_USER: CacheTag = CacheTag::write(caches::USERS, "update_user");
pub const DELETE_USER: CacheTag = CacheTag::write(caches::USERS, "delete_user");
pub const GET_USER: CacheTag = CacheTag::read(caches::USERS, "get_user");
pub const GET_USER_BY_USERNAME: CacheTag = CacheTag::read(caches::USERS, "get_user_by_username");
pub const GET_USERS_BY_EMAIL: CacheTag = CacheTag::read(caches::USERS, "get_users_by_email");
pub const GET_USERS_BY_FEDERATION_LINK: CacheTag =
    CacheTag::read(caches::USERS, "get_users_by_federation_link");
pub const GET_SERVICE_ACCOUNT_USER: CacheTag =
    CacheTag::read(caches::USERS, "get_service_account_user");
pub const GET_USERS_BY_ATTRIBUTE: CacheTag =
    CacheTag::read(caches::USERS, "get_users_by_attribute");
pub const SEARCH_USERS: CacheTag = CacheTag::read(caches::USERS, "search_users");
pub const COUNT_USERS: CacheTag = CacheTag::read(caches::USERS, "count_users");

// === Clients ===
pub const CREATE_CLIENT: CacheTag = CacheTag::write(caches::CLIENTS, "create_client");
pub const UPDATE_CLIENT: CacheTag = CacheTag::write(caches::CLIENTS, "update_client");
pub const DELETE_CLIENT: CacheTag = CacheTag::write(caches::CLIENTS, "delete_client");
pub const GET_CLIENT: CacheTag = CacheTag::read(caches::CLIENTS, "get_client");
pub const GET_CLIENT_BY_CLIENT_ID: CacheTag =
    CacheTag::read(caches::CLIENTS, "get_client_by_client_id");
pub const SEARCH_CLIENTS: CacheTag = CacheTag::read(caches::CLIENTS, "search_clients");
pub const COUNT_CLIENTS: CacheTag = CacheTag::read(caches::CLIENTS, "count_clients");

// === Roles ===
pub const CREATE_ROLE: CacheTag = CacheTag::write(caches::ROLES, "create_role");
pub const UPDATE_ROLE: CacheTag = CacheTag::write(caches::ROLES, "update_role");
pub const DELETE_ROLE: CacheTag = CacheTag::write(caches::ROLES, "delete_role");
pub const GET_ROLE: CacheTag = CacheTag::read(caches::ROLES, "get_role");
pub const GET_REALM_ROLE_BY_NAME: CacheTag =
    CacheTag::read(caches::ROLES, "get_realm_role_by_name");
pub const GET_CLIENT_ROLE_BY_NAME: CacheTag =
    CacheTag::read(caches::ROLES, "get_client_role_by_name");
pub const SEARCH_ROLES: CacheTag = CacheTag::read(caches::ROLES, "search_roles");

// === User sessions ===
pub const UPSERT_USER_SESSION: CacheTag =
    CacheTag::write(caches::USER_SESSIONS, "upsert_user_session");
pub const DELETE_USER_SESSION: CacheTag =
    CacheTag::write(caches::USER_SESSIONS, "delete_user_session");
pub const GET_USER_SESSION: CacheTag = CacheTag::read(caches::USER_SESSIONS, "get_user_session");
pub const FIND_USER_SESSIONS_BY_REALM: CacheTag =
    CacheTag::read(caches::USER_SESSIONS, "find_user_sessions_by_realm");
pub const FIND_USER_SESSIONS_BY_USER: CacheTag =
    CacheTag::read(caches::USER_SESSIONS, "find_user_sessions_by_user");
pub const FIND_USER_SESSIONS_BY_BROKER_SESSION: CacheTag =
    CacheTag::read(caches::USER_SESSIONS, "find_user_sessions_by_broker_session");
pub const FIND_USER_SESSIONS_BY_BROKER_USER: CacheTag =
    CacheTag::read(caches::USER_SESSIONS, "find_user_sessions_by_broker_user");
pub const FIND_USER_SESSIONS_BY_CLIENT: CacheTag =
    CacheTag::read(caches::USER_SESSIONS, "find_user_sessions_by_client");

// === Authentication sessions ===
pub const UPSERT_ROOT_AUTH_SESSION: CacheTag =
    CacheTag::write(caches::AUTH_SESSIONS, "upsert_root_auth_session");
pub const DELETE_ROOT_AUTH_SESSION: CacheTag =
    CacheTag::write(caches::AUTH_SESSIONS, "delete_root_auth_session");
pub const DELETE_ROOT_AUTH_SESSIONS_BY_REALM: CacheTag =
    CacheTag::write(caches::AUTH_SESSIONS, "delete_root_auth_sessions_by_realm");
pub const GET_ROOT_AUTH_SESSION: CacheTag =
    CacheTag::read(caches::AUTH_SESSIONS, "get_root_auth_session");
pub const FIND_ROOT_AUTH_SESSIONS_BY_REALM: CacheTag =
    CacheTag::read(caches::AUTH_SESSIONS, "find_root_auth_sessions_by_realm");

// === Login failures ===
pub const UPSERT_LOGIN_FAILURE: CacheTag =
    CacheTag::write(caches::LOGIN_FAILURES, "upsert_login_failure");
pub const DELETE_LOGIN_FAILURE: CacheTag =
    CacheTag::write(caches::LOGIN_FAILURES, "delete_login_failure");
pub const DELETE_LOGIN_FAILURES_BY_REALM: CacheTag =
    CacheTag::write(caches::LOGIN_FAILURES, "delete_login_failures_by_realm");
pub const GET_LOGIN_FAILURE: CacheTag = CacheTag::read(caches::LOGIN_FAILURES, "get_login_failure");

// === Single-use objects ===
pub const PUT_SINGLE_USE_OBJECT: CacheTag =
    CacheTag::write(caches::SINGLE_USE_OBJECTS, "put_single_use_object");
pub const PUT_SINGLE_USE_OBJECT_IF_ABSENT: CacheTag =
    CacheTag::write(caches::SINGLE_USE_OBJECTS, "put_single_use_object_if_absent");
pub const DELETE_SINGLE_USE_OBJECT: CacheTag =
    CacheTag::write(caches::SINGLE_USE_OBJECTS, "delete_single_use_object");
pub const GET_SINGLE_USE_OBJECT: CacheTag =
    CacheTag::read(caches::SINGLE_USE_OBJECTS, "get_single_use_object");

// === Events ===
pub const INSERT_EVENT: CacheTag = CacheTag::write(caches::EVENTS, "insert_event");
pub const DELETE_EVENTS_BY_REALM: CacheTag =
    CacheTag::write(caches::EVENTS, "delete_events_by_realm");
pub const QUERY_EVENTS: CacheTag = CacheTag::read(caches::EVENTS, "query_events");
