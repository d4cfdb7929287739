//! Role entity store trait.

use async_trait::async_trait;
use kc_model::Role;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StorageResult;

/// Store for roles.
///
/// Role names are unique per container: the realm for realm roles, the
/// owning client for client roles.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Creates a new role.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a role with the same name exists
    /// in the same container.
    async fn create(&self, role: &Role) -> StorageResult<()>;

    /// Writes a changed role, re-indexing the name from `previous`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a changed name is taken.
    async fn update(&self, previous: &Role, role: &Role) -> StorageResult<()>;

    /// Deletes a role and its index rows. Returns whether it existed.
    async fn delete(&self, role: &Role) -> StorageResult<bool>;

    /// Gets a role by ID.
    async fn get_by_id(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<Role>>;

    /// Gets a realm role by name.
    async fn get_realm_role_by_name(
        &self,
        realm_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Role>>;

    /// Gets a client role by name.
    async fn get_client_role_by_name(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Role>>;

    /// Searches roles matching criteria, ordered by name.
    async fn search(
        &self,
        realm_id: Uuid,
        criteria: &RoleSearchCriteria,
    ) -> StorageResult<Vec<Role>>;
}

/// Which roles a search covers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoleScope {
    /// Every role of the realm.
    #[default]
    All,
    /// Realm roles only.
    Realm,
    /// Roles of one client.
    Client(Uuid),
}

/// Search criteria for roles.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RoleSearchCriteria {
    /// Roles to consider.
    pub scope: RoleScope,
    /// Case-insensitive name fragment.
    pub search: Option<String>,
    /// Offset for pagination.
    pub first: Option<usize>,
    /// Maximum results to return.
    pub max: Option<usize>,
}

impl RoleSearchCriteria {
    /// Creates a new search criteria over all roles of a realm.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scope: RoleScope::All,
            search: None,
            first: None,
            max: None,
        }
    }

    /// Restricts to realm roles.
    #[must_use]
    pub const fn realm_roles() -> Self {
        let mut criteria = Self::new();
        criteria.scope = RoleScope::Realm;
        criteria
    }

    /// Restricts to roles of a client.
    #[must_use]
    pub const fn client_roles(client_id: Uuid) -> Self {
        let mut criteria = Self::new();
        criteria.scope = RoleScope::Client(client_id);
        criteria
    }

    /// Sets the name fragment.
    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Sets offset and maximum results.
    #[must_use]
    pub const fn page(mut self, first: Option<usize>, max: Option<usize>) -> Self {
        self.first = first;
        self.max = max;
        self
    }

    /// Checks whether a role matches the filters (pagination excluded).
    #[must_use]
    pub fn matches(&self, role: &Role) -> bool {
        let in_scope = match self.scope {
            RoleScope::All => true,
            RoleScope::Realm => role.client_id.is_none(),
            RoleScope::Client(client_id) => role.client_id == Some(client_id),
        };
        in_scope
            && self.search.as_deref().is_none_or(|fragment| {
                role.name.to_lowercase().contains(&fragment.to_lowercase())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_filters() {
        let realm_id = Uuid::now_v7();
        let client_id = Uuid::now_v7();
        let realm_role = Role::new_realm_role(realm_id, "admin");
        let client_role = Role::new_client_role(realm_id, client_id, "viewer");

        assert!(RoleSearchCriteria::realm_roles().matches(&realm_role));
        assert!(!RoleSearchCriteria::realm_roles().matches(&client_role));
        assert!(RoleSearchCriteria::client_roles(client_id).matches(&client_role));
        assert!(RoleSearchCriteria::new().search("VIEW").matches(&client_role));
    }
}
