use kc_model::Role;
use kc_storage::{RoleSearchCriteria, StorageResult};
use uuid::Uuid;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Creates a role.
    ///
    /// # Errors
    ///
    /// Duplicate name within the container, or store failure.
    pub async fn create_role(&self, role: &Role) -> StorageResult<()> {
        self.cache
            .intercept_write(tags::CREATE_ROLE, self.stores.roles.create(role))
            .await
    }

    /// Writes a changed role, re-indexing from `previous`.
    ///
    /// # Errors
    ///
    /// Duplicate name within the container, or store failure.
    pub async fn update_role(&self, previous: &Role, role: &Role) -> StorageResult<()> {
        self.cache
            .intercept_write(tags::UPDATE_ROLE, self.stores.roles.update(previous, role))
            .await
    }

    /// Deletes a role. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_role(&self, role: &Role) -> StorageResult<bool> {
        self.cache
            .intercept_write(tags::DELETE_ROLE, self.stores.roles.delete(role))
            .await
    }

    /// Gets a role by ID.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_role(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<Role>> {
        self.cache
            .intercept_read(
                tags::GET_ROLE,
                &(realm_id, id),
                self.stores.roles.get_by_id(realm_id, id),
            )
            .await
    }

    /// Gets a realm role by name.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_realm_role_by_name(
        &self,
        realm_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Role>> {
        self.cache
            .intercept_read(
                tags::GET_REALM_ROLE_BY_NAME,
                &(realm_id, name),
                self.stores.roles.get_realm_role_by_name(realm_id, name),
            )
            .await
    }

    /// Gets a client role by name.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_client_role_by_name(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Role>> {
        self.cache
            .intercept_read(
                tags::GET_CLIENT_ROLE_BY_NAME,
                &(realm_id, client_id, name),
                self.stores
                    .roles
                    .get_client_role_by_name(realm_id, client_id, name),
            )
            .await
    }

    /// Searches roles.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn search_roles(
        &self,
        realm_id: Uuid,
        criteria: &RoleSearchCriteria,
    ) -> StorageResult<Vec<Role>> {
        self.cache
            .intercept_read(
                tags::SEARCH_ROLES,
                &(realm_id, criteria),
                self.stores.roles.search(realm_id, criteria),
            )
            .await
    }
}
