use kc_model::Client;
use kc_storage::{ClientSearchCriteria, StorageResult};
use uuid::Uuid;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Duplicate `client_id` or store failure.
    pub async fn create_client(&self, client: &Client) -> StorageResult<()> {
        self.cache
            .intercept_write(tags::CREATE_CLIENT, self.stores.clients.create(client))
            .await
    }

    /// Writes a changed client, re-indexing from `previous`.
    ///
    /// # Errors
    ///
    /// Duplicate `client_id` or store failure.
    pub async fn update_client(&self, previous: &Client, client: &Client) -> StorageResult<()> {
        self.cache
            .intercept_write(
                tags::UPDATE_CLIENT,
                self.stores.clients.update(previous, client),
            )
            .await
    }

    /// Deletes a client. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_client(&self, client: &Client) -> StorageResult<bool> {
        self.cache
            .intercept_write(tags::DELETE_CLIENT, self.stores.clients.delete(client))
            .await
    }

    /// Gets a client by internal ID.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_client(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<Client>> {
        self.cache
            .intercept_read(
                tags::GET_CLIENT,
                &(realm_id, id),
                self.stores.clients.get_by_id(realm_id, id),
            )
            .await
    }

    /// Gets a client by `client_id`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_client_by_client_id(
        &self,
        realm_id: Uuid,
        client_id: &str,
    ) -> StorageResult<Option<Client>> {
        self.cache
            .intercept_read(
                tags::GET_CLIENT_BY_CLIENT_ID,
                &(realm_id, client_id),
                self.stores.clients.get_by_client_id(realm_id, client_id),
            )
            .await
    }

    /// Searches clients.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn search_clients(
        &self,
        realm_id: Uuid,
        criteria: &ClientSearchCriteria,
    ) -> StorageResult<Vec<Client>> {
        self.cache
            .intercept_read(
                tags::SEARCH_CLIENTS,
                &(realm_id, criteria),
                self.stores.clients.search(realm_id, criteria),
            )
            .await
    }

    /// Counts clients of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn count_clients(&self, realm_id: Uuid) -> StorageResult<u64> {
        self.cache
            .intercept_read(
                tags::COUNT_CLIENTS,
                &realm_id,
                self.stores.clients.count(realm_id),
            )
            .await
    }
}
