//! Column-store realm store.

use std::sync::Arc;

use async_trait::async_trait;
use kc_model::Realm;
use kc_storage::{RealmStore, StorageError, StorageResult};
use uuid::Uuid;

use crate::boundary::ColumnStore;
use crate::index::UniqueIndex;
use crate::schema;
use crate::table::Table;

const PARTITION: &str = "realms";
const REALMS: Table = Table::new(schema::REALMS);
const BY_NAME: UniqueIndex = UniqueIndex::new(schema::REALMS_BY_NAME);

/// Realm store over a [`ColumnStore`].
pub struct ColumnRealmStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnRealmStore {
    /// Creates a realm store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }

    async fn claim_name(&self, realm: &Realm) -> StorageResult<()> {
        if BY_NAME.claim(&self.store, &realm.name, realm.id, None).await? {
            Ok(())
        } else {
            Err(StorageError::duplicate("Realm", "name", &realm.name))
        }
    }
}

#[async_trait]
impl RealmStore for ColumnRealmStore {
    async fn create(&self, realm: &Realm) -> StorageResult<()> {
        self.claim_name(realm).await?;
        REALMS
            .put(&self.store, PARTITION, &realm.id.to_string(), realm, None)
            .await
    }

    async fn update(&self, previous: &Realm, realm: &Realm) -> StorageResult<()> {
        let renamed = previous.name != realm.name;
        if renamed {
            self.claim_name(realm).await?;
        }
        REALMS
            .put(&self.store, PARTITION, &realm.id.to_string(), realm, None)
            .await?;
        if renamed {
            BY_NAME.release(&self.store, &previous.name, realm.id).await?;
        }
        Ok(())
    }

    async fn delete(&self, realm: &Realm) -> StorageResult<bool> {
        let existed = REALMS
            .remove(&self.store, PARTITION, &realm.id.to_string())
            .await?;
        BY_NAME.release(&self.store, &realm.name, realm.id).await?;
        Ok(existed)
    }

    async fn get_by_id(&self, id: Uuid) -> StorageResult<Option<Realm>> {
        REALMS.get(&self.store, PARTITION, &id.to_string()).await
    }

    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Realm>> {
        let Some(id) = BY_NAME.lookup(&self.store, name).await? else {
            return Ok(None);
        };
        Ok(self
            .get_by_id(id)
            .await?
            .filter(|realm| realm.name == name))
    }

    async fn list(&self) -> StorageResult<Vec<Realm>> {
        let mut realms: Vec<Realm> = REALMS.all(&self.store, PARTITION).await?;
        realms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(realms)
    }
}

#[cfg(test)]
mod tests {
    use kc_core::Clock;

    use super::*;
    use crate::InMemoryKeyspace;

    fn store() -> ColumnRealmStore {
        ColumnRealmStore::new(Arc::new(InMemoryKeyspace::new(Clock::new())))
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let store = store();
        store.create(&Realm::new("acme")).await.unwrap();

        let err = store.create(&Realm::new("acme")).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rename_moves_index() {
        let store = store();
        let realm = Realm::new("old");
        store.create(&realm).await.unwrap();

        let mut renamed = realm.clone();
        renamed.name = "new".to_string();
        store.update(&realm, &renamed).await.unwrap();

        assert!(store.get_by_name("old").await.unwrap().is_none());
        assert_eq!(store.get_by_name("new").await.unwrap().unwrap().id, realm.id);
        store.create(&Realm::new("old")).await.unwrap();
    }

    #[tokio::test]
    async fn delete_twice() {
        let store = store();
        let realm = Realm::new("gone");
        store.create(&realm).await.unwrap();

        assert!(store.delete(&realm).await.unwrap());
        assert!(!store.delete(&realm).await.unwrap());
        assert!(store.get_by_name("gone").await.unwrap().is_none());
    }
}
