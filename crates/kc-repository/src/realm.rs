use kc_model::Realm;
use kc_storage::StorageResult;
use uuid::Uuid;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Creates a realm.
    ///
    /// # Errors
    ///
    /// Duplicate name or store failure.
    pub async fn create_realm(&self, realm: &Realm) -> StorageResult<()> {
        self.cache
            .intercept_write(tags::CREATE_REALM, self.stores.realms.create(realm))
            .await
    }

    /// Writes a changed realm, re-indexing from `previous`.
    ///
    /// # Errors
    ///
    /// Duplicate name or store failure.
    pub async fn update_realm(&self, previous: &Realm, realm: &Realm) -> StorageResult<()> {
        self.cache
            .intercept_write(tags::UPDATE_REALM, self.stores.realms.update(previous, realm))
            .await
    }

    /// Deletes a realm row. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_realm(&self, realm: &Realm) -> StorageResult<bool> {
        self.cache
            .intercept_write(tags::DELETE_REALM, self.stores.realms.delete(realm))
            .await
    }

    /// Gets a realm by ID.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_realm(&self, id: Uuid) -> StorageResult<Option<Realm>> {
        self.cache
            .intercept_read(tags::GET_REALM, &id, self.stores.realms.get_by_id(id))
            .await
    }

    /// Gets a realm by name.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_realm_by_name(&self, name: &str) -> StorageResult<Option<Realm>> {
        self.cache
            .intercept_read(
                tags::GET_REALM_BY_NAME,
                name,
                self.stores.realms.get_by_name(name),
            )
            .await
    }

    /// Lists every realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn list_realms(&self) -> StorageResult<Vec<Realm>> {
        self.cache
            .intercept_read(tags::LIST_REALMS, &(), self.stores.realms.list())
            .await
    }
}
