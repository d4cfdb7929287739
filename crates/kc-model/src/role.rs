//! Role domain model.
//!
//! Roles are realm-level or client-level. Names are unique within their
//! container (the realm, or the owning client).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Keycloak role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Role name (unique within realm or client).
    pub name: String,
    /// Role description.
    pub description: Option<String>,

    // === Scope ===
    /// Realm this role belongs to.
    pub realm_id: Uuid,
    /// Client this role belongs to (None for realm roles).
    pub client_id: Option<Uuid>,

    // === Timestamps ===
    /// When the role was created.
    pub created_at: DateTime<Utc>,
    /// When the role was last updated.
    pub updated_at: DateTime<Utc>,

    // === Composite Roles ===
    /// Composite role IDs (roles that this role includes).
    pub composite_roles: Vec<Uuid>,

    // === Custom Attributes ===
    /// Custom role attributes.
    pub attributes: HashMap<String, Vec<String>>,
}

impl Role {
    fn build(realm_id: Uuid, client_id: Option<Uuid>, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name,
            description: None,
            realm_id,
            client_id,
            created_at: now,
            updated_at: now,
            composite_roles: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Creates a new realm role.
    #[must_use]
    pub fn new_realm_role(realm_id: Uuid, name: impl Into<String>) -> Self {
        Self::build(realm_id, None, name.into())
    }

    /// Creates a new client role.
    #[must_use]
    pub fn new_client_role(realm_id: Uuid, client_id: Uuid, name: impl Into<String>) -> Self {
        Self::build(realm_id, Some(client_id), name.into())
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Checks if this is a realm role.
    #[must_use]
    pub const fn is_realm_role(&self) -> bool {
        self.client_id.is_none()
    }

    /// Checks if this is a composite role.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        !self.composite_roles.is_empty()
    }

    /// Key of the container that scopes the role name: the client id for
    /// client roles, the realm id otherwise.
    #[must_use]
    pub fn container_id(&self) -> Uuid {
        self.client_id.unwrap_or(self.realm_id)
    }
}

/// Well-known realm role names.
pub mod realm_roles {
    /// Offline access role (for refresh tokens).
    pub const OFFLINE_ACCESS: &str = "offline_access";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm_role_creation() {
        let realm_id = Uuid::now_v7();
        let role = Role::new_realm_role(realm_id, "admin");

        assert_eq!(role.name, "admin");
        assert!(role.is_realm_role());
        assert!(!role.is_composite());
        assert_eq!(role.container_id(), realm_id);
    }

    #[test]
    fn client_role_container_is_client() {
        let realm_id = Uuid::now_v7();
        let client_id = Uuid::now_v7();
        let role = Role::new_client_role(realm_id, client_id, "manager");

        assert!(!role.is_realm_role());
        assert_eq!(role.container_id(), client_id);
    }
}
