//! Column-store client store.

use std::sync::Arc;

use async_trait::async_trait;
use kc_model::Client;
use kc_storage::{ClientSearchCriteria, ClientStore, StorageError, StorageResult};
use uuid::Uuid;

use crate::boundary::ColumnStore;
use crate::index::{UniqueIndex, key};
use crate::schema;
use crate::table::{Table, paginate};

const CLIENTS: Table = Table::new(schema::CLIENTS);
const BY_CLIENT_ID: UniqueIndex = UniqueIndex::new(schema::CLIENTS_BY_CLIENT_ID);

fn client_id_key(realm_id: Uuid, client_id: &str) -> String {
    key(&[&realm_id.to_string(), client_id])
}

/// Client store over a [`ColumnStore`].
pub struct ColumnClientStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnClientStore {
    /// Creates a client store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }

    async fn claim_client_id(&self, client: &Client) -> StorageResult<()> {
        let key = client_id_key(client.realm_id, &client.client_id);
        if BY_CLIENT_ID.claim(&self.store, &key, client.id, None).await? {
            Ok(())
        } else {
            Err(StorageError::duplicate("Client", "client_id", &client.client_id))
        }
    }

    async fn write(&self, client: &Client) -> StorageResult<()> {
        CLIENTS
            .put(
                &self.store,
                &client.realm_id.to_string(),
                &client.id.to_string(),
                client,
                None,
            )
            .await
    }
}

#[async_trait]
impl ClientStore for ColumnClientStore {
    async fn create(&self, client: &Client) -> StorageResult<()> {
        self.claim_client_id(client).await?;
        self.write(client).await
    }

    async fn update(&self, previous: &Client, client: &Client) -> StorageResult<()> {
        let renamed = previous.client_id != client.client_id;
        if renamed {
            self.claim_client_id(client).await?;
        }
        self.write(client).await?;
        if renamed {
            let old = client_id_key(previous.realm_id, &previous.client_id);
            BY_CLIENT_ID.release(&self.store, &old, client.id).await?;
        }
        Ok(())
    }

    async fn delete(&self, client: &Client) -> StorageResult<bool> {
        let existed = CLIENTS
            .remove(
                &self.store,
                &client.realm_id.to_string(),
                &client.id.to_string(),
            )
            .await?;
        let key = client_id_key(client.realm_id, &client.client_id);
        BY_CLIENT_ID.release(&self.store, &key, client.id).await?;
        Ok(existed)
    }

    async fn get_by_id(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<Client>> {
        CLIENTS
            .get(&self.store, &realm_id.to_string(), &id.to_string())
            .await
    }

    async fn get_by_client_id(
        &self,
        realm_id: Uuid,
        client_id: &str,
    ) -> StorageResult<Option<Client>> {
        let key = client_id_key(realm_id, client_id);
        let Some(id) = BY_CLIENT_ID.lookup(&self.store, &key).await? else {
            return Ok(None);
        };
        Ok(self
            .get_by_id(realm_id, id)
            .await?
            .filter(|c| c.client_id == client_id))
    }

    async fn search(
        &self,
        realm_id: Uuid,
        criteria: &ClientSearchCriteria,
    ) -> StorageResult<Vec<Client>> {
        let mut clients: Vec<Client> = CLIENTS.all(&self.store, &realm_id.to_string()).await?;
        clients.retain(|c| criteria.matches(c));
        clients.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        Ok(paginate(clients, criteria.first, criteria.max))
    }

    async fn count(&self, realm_id: Uuid) -> StorageResult<u64> {
        let rows = self
            .store
            .select_partition(schema::CLIENTS, &realm_id.to_string())
            .await?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use kc_core::Clock;

    use super::*;
    use crate::InMemoryKeyspace;

    #[tokio::test]
    async fn client_id_rename_and_duplicate() {
        let store = ColumnClientStore::new(Arc::new(InMemoryKeyspace::new(Clock::new())));
        let realm_id = Uuid::now_v7();
        let app = Client::new(realm_id, "app");
        let other = Client::new(realm_id, "other");
        store.create(&app).await.unwrap();
        store.create(&other).await.unwrap();

        let mut clash = other.clone();
        clash.client_id = "app".to_string();
        assert!(store.update(&other, &clash).await.unwrap_err().is_duplicate());

        let mut renamed = app.clone();
        renamed.client_id = "app-v2".to_string();
        store.update(&app, &renamed).await.unwrap();

        assert!(store.get_by_client_id(realm_id, "app").await.unwrap().is_none());
        assert!(store.get_by_client_id(realm_id, "app-v2").await.unwrap().is_some());
        assert_eq!(store.count(realm_id).await.unwrap(), 2);
    }
}
