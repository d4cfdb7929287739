//! Column-store role store.

use std::sync::Arc;

use async_trait::async_trait;
use kc_model::Role;
use kc_storage::{RoleSearchCriteria, RoleStore, StorageError, StorageResult};
use uuid::Uuid;

use crate::boundary::ColumnStore;
use crate::index::{UniqueIndex, key};
use crate::schema;
use crate::table::{Table, paginate};

const ROLES: Table = Table::new(schema::ROLES);
const BY_NAME: UniqueIndex = UniqueIndex::new(schema::ROLES_BY_NAME);

fn name_key(realm_id: Uuid, container_id: Uuid, name: &str) -> String {
    key(&[&realm_id.to_string(), &container_id.to_string(), name])
}

fn role_name_key(role: &Role) -> String {
    name_key(role.realm_id, role.container_id(), &role.name)
}

/// Role store over a [`ColumnStore`].
pub struct ColumnRoleStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnRoleStore {
    /// Creates a role store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }

    async fn claim_name(&self, role: &Role) -> StorageResult<()> {
        if BY_NAME
            .claim(&self.store, &role_name_key(role), role.id, None)
            .await?
        {
            Ok(())
        } else {
            Err(StorageError::duplicate("Role", "name", &role.name))
        }
    }

    async fn write(&self, role: &Role) -> StorageResult<()> {
        ROLES
            .put(
                &self.store,
                &role.realm_id.to_string(),
                &role.id.to_string(),
                role,
                None,
            )
            .await
    }

    async fn by_name(
        &self,
        realm_id: Uuid,
        container_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Role>> {
        let key = name_key(realm_id, container_id, name);
        let Some(id) = BY_NAME.lookup(&self.store, &key).await? else {
            return Ok(None);
        };
        Ok(self
            .get_by_id(realm_id, id)
            .await?
            .filter(|r| r.name == name && r.container_id() == container_id))
    }
}

#[async_trait]
impl RoleStore for ColumnRoleStore {
    async fn create(&self, role: &Role) -> StorageResult<()> {
        self.claim_name(role).await?;
        self.write(role).await
    }

    async fn update(&self, previous: &Role, role: &Role) -> StorageResult<()> {
        let renamed = previous.name != role.name;
        if renamed {
            self.claim_name(role).await?;
        }
        self.write(role).await?;
        if renamed {
            BY_NAME
                .release(&self.store, &role_name_key(previous), role.id)
                .await?;
        }
        Ok(())
    }

    async fn delete(&self, role: &Role) -> StorageResult<bool> {
        let existed = ROLES
            .remove(&self.store, &role.realm_id.to_string(), &role.id.to_string())
            .await?;
        BY_NAME
            .release(&self.store, &role_name_key(role), role.id)
            .await?;
        Ok(existed)
    }

    async fn get_by_id(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<Role>> {
        ROLES
            .get(&self.store, &realm_id.to_string(), &id.to_string())
            .await
    }

    async fn get_realm_role_by_name(
        &self,
        realm_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Role>> {
        self.by_name(realm_id, realm_id, name).await
    }

    async fn get_client_role_by_name(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Role>> {
        self.by_name(realm_id, client_id, name).await
    }

    async fn search(
        &self,
        realm_id: Uuid,
        criteria: &RoleSearchCriteria,
    ) -> StorageResult<Vec<Role>> {
        let mut roles: Vec<Role> = ROLES.all(&self.store, &realm_id.to_string()).await?;
        roles.retain(|r| criteria.matches(r));
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(roles, criteria.first, criteria.max))
    }
}
