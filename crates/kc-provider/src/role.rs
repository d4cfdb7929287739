//! Role provider and adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kc_model::Role;
use kc_repository::CompositeRepository;
use kc_spi::{Dirtyable, EntityCell, Flushable, Identifiable, KeycloakSession, UndoCreate, kinds};
use kc_storage::{RoleSearchCriteria, StorageError, StorageResult};
use tracing::debug;
use uuid::Uuid;

/// Request-scoped view of one role.
#[derive(Debug)]
pub struct RoleAdapter {
    cell: EntityCell<Role>,
    repo: Arc<CompositeRepository>,
}

impl RoleAdapter {
    fn new(role: Role, repo: Arc<CompositeRepository>) -> Self {
        Self {
            cell: EntityCell::loaded(kinds::ROLE, role),
            repo,
        }
    }

    fn modify(&self, f: impl FnOnce(&mut Role)) -> StorageResult<()> {
        self.cell.update(|role| {
            f(role);
            role.updated_at = Utc::now();
        })
    }

    /// Role ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.cell.read(|r| r.id)
    }

    /// Realm ID.
    #[must_use]
    pub fn realm_id(&self) -> Uuid {
        self.cell.read(|r| r.realm_id)
    }

    /// Owning client, `None` for realm roles.
    #[must_use]
    pub fn client_id(&self) -> Option<Uuid> {
        self.cell.read(|r| r.client_id)
    }

    /// Role name.
    #[must_use]
    pub fn name(&self) -> String {
        self.cell.read(|r| r.name.clone())
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.cell.read(|r| r.description.clone())
    }

    /// IDs of the composite children.
    #[must_use]
    pub fn composites(&self) -> Vec<Uuid> {
        self.cell.read(|r| r.composite_roles.clone())
    }

    /// Copy of the current state.
    #[must_use]
    pub fn entity(&self) -> Role {
        self.cell.snapshot()
    }

    /// Renames the role.
    ///
    /// # Errors
    ///
    /// Duplicate when the realm or client already has a role with the name,
    /// store failure, or invalid state.
    pub async fn set_name(&self, name: &str) -> StorageResult<()> {
        self.cell.ensure_live()?;
        let (realm_id, client_id, id) = self.cell.read(|r| (r.realm_id, r.client_id, r.id));
        let existing = match client_id {
            Some(client_id) => {
                self.repo
                    .get_client_role_by_name(realm_id, client_id, name)
                    .await?
            }
            None => self.repo.get_realm_role_by_name(realm_id, name).await?,
        };
        if existing.is_some_and(|other| other.id != id) {
            return Err(StorageError::duplicate("Role", "name", name));
        }
        self.modify(|r| r.name = name.to_string())
    }

    /// Sets the description.
    pub fn set_description(&self, description: Option<String>) -> StorageResult<()> {
        self.modify(|r| r.description = description)
    }

    /// Adds a composite child.
    pub fn add_composite_role(&self, role_id: Uuid) -> StorageResult<()> {
        self.modify(|r| {
            if !r.composite_roles.contains(&role_id) {
                r.composite_roles.push(role_id);
            }
        })
    }

    /// Removes a composite child.
    pub fn remove_composite_role(&self, role_id: Uuid) -> StorageResult<()> {
        self.modify(|r| r.composite_roles.retain(|c| *c != role_id))
    }

    /// Replaces the values of an attribute.
    pub fn set_attribute(&self, name: &str, values: Vec<String>) -> StorageResult<()> {
        self.modify(|r| {
            r.attributes.insert(name.to_string(), values);
        })
    }

    /// Removes an attribute.
    pub fn remove_attribute(&self, name: &str) -> StorageResult<()> {
        self.modify(|r| {
            r.attributes.remove(name);
        })
    }
}

impl Identifiable for RoleAdapter {
    fn kind(&self) -> &'static str {
        kinds::ROLE
    }

    fn id(&self) -> Uuid {
        Self::id(self)
    }
}

impl Dirtyable for RoleAdapter {
    fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    fn mark_dirty(&self) {
        self.cell.mark_dirty();
    }
}

#[async_trait]
impl Flushable for RoleAdapter {
    async fn flush(&self, repo: &CompositeRepository) -> StorageResult<bool> {
        let Some(write) = self.cell.pending() else {
            return Ok(false);
        };
        match &write.previous {
            Some(previous) => repo.update_role(previous, &write.current).await?,
            None => repo.create_role(&write.current).await?,
        }
        debug!(role_id = %write.current.id, "role flushed");
        self.cell.complete(write);
        Ok(true)
    }

    fn discard(&self) {
        self.cell.discard();
    }
}

/// Role operations of one request.
#[derive(Debug, Clone)]
pub struct RoleProvider {
    session: Arc<KeycloakSession>,
}

impl RoleProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    fn wrap(&self, role: Role) -> Arc<RoleAdapter> {
        let registry = self.session.registry();
        if let Some(existing) = registry.get::<RoleAdapter>(kinds::ROLE, role.id) {
            return existing;
        }
        registry.register(Arc::new(RoleAdapter::new(
            role,
            Arc::clone(self.session.repository()),
        )))
    }

    async fn add(&self, mut role: Role, id: Option<Uuid>) -> StorageResult<Arc<RoleAdapter>> {
        self.session.ensure_open()?;
        if let Some(id) = id {
            role.id = id;
        }
        self.session.repository().create_role(&role).await?;
        self.session
            .register_compensation(UndoCreate::Role(role.clone()));
        debug!(realm_id = %role.realm_id, name = %role.name, "role added");
        Ok(self.wrap(role))
    }

    /// Adds a realm role.
    ///
    /// # Errors
    ///
    /// Duplicate when the realm already has the name, or store failure.
    pub async fn add_realm_role(
        &self,
        realm_id: Uuid,
        id: Option<Uuid>,
        name: &str,
    ) -> StorageResult<Arc<RoleAdapter>> {
        self.add(Role::new_realm_role(realm_id, name), id).await
    }

    /// Adds a client role.
    ///
    /// # Errors
    ///
    /// Duplicate when the client already has the name, or store failure.
    pub async fn add_client_role(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        id: Option<Uuid>,
        name: &str,
    ) -> StorageResult<Arc<RoleAdapter>> {
        self.add(Role::new_client_role(realm_id, client_id, name), id)
            .await
    }

    /// Gets a role by ID.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_role_by_id(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<Arc<RoleAdapter>>> {
        if let Some(adapter) = self.session.registry().get::<RoleAdapter>(kinds::ROLE, id) {
            return Ok((adapter.realm_id() == realm_id).then_some(adapter));
        }
        let role = self.session.repository().get_role(realm_id, id).await?;
        Ok(role.map(|r| self.wrap(r)))
    }

    /// Gets a realm role by name.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_realm_role(
        &self,
        realm_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Arc<RoleAdapter>>> {
        let role = self
            .session
            .repository()
            .get_realm_role_by_name(realm_id, name)
            .await?;
        Ok(role.map(|r| self.wrap(r)).filter(|a| a.name() == name))
    }

    /// Gets a client role by name.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_client_role(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Arc<RoleAdapter>>> {
        let role = self
            .session
            .repository()
            .get_client_role_by_name(realm_id, client_id, name)
            .await?;
        Ok(role.map(|r| self.wrap(r)).filter(|a| a.name() == name))
    }

    async fn search(
        &self,
        realm_id: Uuid,
        criteria: &RoleSearchCriteria,
    ) -> StorageResult<Vec<Arc<RoleAdapter>>> {
        let roles = self
            .session
            .repository()
            .search_roles(realm_id, criteria)
            .await?;
        Ok(roles.into_iter().map(|r| self.wrap(r)).collect())
    }

    /// Lists realm roles ordered by name.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_realm_roles(
        &self,
        realm_id: Uuid,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<Arc<RoleAdapter>>> {
        self.search(realm_id, &RoleSearchCriteria::realm_roles().page(first, max))
            .await
    }

    /// Lists the roles of a client ordered by name.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_client_roles(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<Arc<RoleAdapter>>> {
        let criteria = RoleSearchCriteria::client_roles(client_id).page(first, max);
        self.search(realm_id, &criteria).await
    }

    /// Searches realm roles, or the roles of one client, by name fragment.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn search_for_roles(
        &self,
        realm_id: Uuid,
        client_id: Option<Uuid>,
        fragment: &str,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<Arc<RoleAdapter>>> {
        let criteria = client_id
            .map_or_else(RoleSearchCriteria::realm_roles, RoleSearchCriteria::client_roles)
            .search(fragment)
            .page(first, max);
        self.search(realm_id, &criteria).await
    }

    /// Removes a role.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_role(&self, realm_id: Uuid, id: Uuid) -> StorageResult<bool> {
        self.session.ensure_open()?;
        let Some(adapter) = self.get_role_by_id(realm_id, id).await? else {
            return Ok(false);
        };
        self.remove_adapter(&adapter).await
    }

    async fn remove_adapter(&self, adapter: &RoleAdapter) -> StorageResult<bool> {
        let stored = adapter.cell.persisted().unwrap_or_else(|| adapter.entity());
        let removed = self.session.repository().delete_role(&stored).await?;
        self.session.registry().remove(kinds::ROLE, stored.id);
        Ok(removed)
    }

    /// Removes every role of a realm, client roles included.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_roles(&self, realm_id: Uuid) -> StorageResult<()> {
        for role in self.search(realm_id, &RoleSearchCriteria::new()).await? {
            self.remove_adapter(&role).await?;
        }
        Ok(())
    }

    /// Removes every role of a client.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_client_roles(&self, realm_id: Uuid, client_id: Uuid) -> StorageResult<()> {
        let criteria = RoleSearchCriteria::client_roles(client_id);
        for role in self.search(realm_id, &criteria).await? {
            self.remove_adapter(&role).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn names_unique_per_container() {
        let harness = Harness::new();
        let provider = RoleProvider::new(harness.session());
        let realm_id = Uuid::now_v7();
        let client_id = Uuid::now_v7();

        provider.add_realm_role(realm_id, None, "admin").await.unwrap();
        provider
            .add_client_role(realm_id, client_id, None, "admin")
            .await
            .unwrap();
        let err = provider
            .add_realm_role(realm_id, None, "admin")
            .await
            .unwrap_err();

        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn rename_checks_container() {
        let harness = Harness::new();
        let provider = RoleProvider::new(harness.session());
        let realm_id = Uuid::now_v7();
        provider.add_realm_role(realm_id, None, "admin").await.unwrap();
        let user = provider.add_realm_role(realm_id, None, "user").await.unwrap();

        assert!(user.set_name("admin").await.unwrap_err().is_duplicate());
        user.set_name("member").await.unwrap();

        assert_eq!(user.name(), "member");
        assert!(provider.get_realm_role(realm_id, "user").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_and_search() {
        let harness = Harness::new();
        let provider = RoleProvider::new(harness.session());
        let realm_id = Uuid::now_v7();
        let client_id = Uuid::now_v7();
        for name in ["offline_access", "uma_authorization", "admin"] {
            provider.add_realm_role(realm_id, None, name).await.unwrap();
        }
        provider
            .add_client_role(realm_id, client_id, None, "view-profile")
            .await
            .unwrap();

        let realm_roles = provider.get_realm_roles(realm_id, None, None).await.unwrap();
        let names: Vec<String> = realm_roles.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["admin", "offline_access", "uma_authorization"]);

        let found = provider
            .search_for_roles(realm_id, None, "AUTH", None, None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let client_roles = provider
            .get_client_roles(realm_id, client_id, None, None)
            .await
            .unwrap();
        assert_eq!(client_roles.len(), 1);

        provider.remove_roles(realm_id).await.unwrap();
        assert!(
            provider
                .get_client_roles(realm_id, client_id, None, None)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
