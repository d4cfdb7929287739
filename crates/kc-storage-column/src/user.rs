//! Column-store user store.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use kc_model::User;
use kc_storage::{StorageError, StorageResult, UserSearchCriteria, UserStore};
use uuid::Uuid;

use crate::boundary::ColumnStore;
use crate::index::{MultiIndex, UniqueIndex, key};
use crate::schema;
use crate::table::{Table, paginate};

const USERS: Table = Table::new(schema::USERS);
const BY_USERNAME: UniqueIndex = UniqueIndex::new(schema::USERS_BY_USERNAME);
const BY_SERVICE_ACCOUNT: UniqueIndex = UniqueIndex::new(schema::USERS_BY_SERVICE_ACCOUNT);
const BY_EMAIL: MultiIndex = MultiIndex::new(schema::USERS_BY_EMAIL);
const BY_FEDERATION_LINK: MultiIndex = MultiIndex::new(schema::USERS_BY_FEDERATION_LINK);
const BY_ATTRIBUTE: MultiIndex = MultiIndex::new(schema::USERS_BY_ATTRIBUTE);

/// Partition keys of the multi-valued index rows a user owns.
fn multi_keys(user: &User) -> BTreeSet<(&'static str, String)> {
    let realm = user.realm_id.to_string();
    let mut keys = BTreeSet::new();
    if let Some(email) = &user.email {
        keys.insert((schema::USERS_BY_EMAIL, key(&[&realm, &email.to_lowercase()])));
    }
    if let Some(link) = &user.federation_link {
        keys.insert((schema::USERS_BY_FEDERATION_LINK, key(&[&realm, link])));
    }
    for (name, values) in &user.attributes {
        for value in values {
            keys.insert((schema::USERS_BY_ATTRIBUTE, key(&[&realm, name, value])));
        }
    }
    keys
}

fn multi_index(table: &'static str) -> MultiIndex {
    match table {
        schema::USERS_BY_EMAIL => BY_EMAIL,
        schema::USERS_BY_FEDERATION_LINK => BY_FEDERATION_LINK,
        _ => BY_ATTRIBUTE,
    }
}

fn username_key(realm_id: Uuid, username: &str) -> String {
    key(&[&realm_id.to_string(), &username.to_lowercase()])
}

fn service_account_key(realm_id: Uuid, client_id: Uuid) -> String {
    key(&[&realm_id.to_string(), &client_id.to_string()])
}

/// User store over a [`ColumnStore`].
pub struct ColumnUserStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnUserStore {
    /// Creates a user store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }

    async fn claim_username(&self, user: &User) -> StorageResult<()> {
        let key = username_key(user.realm_id, &user.username);
        if BY_USERNAME.claim(&self.store, &key, user.id, None).await? {
            Ok(())
        } else {
            Err(StorageError::duplicate("User", "username", &user.username))
        }
    }

    async fn claim_service_account(&self, user: &User) -> StorageResult<()> {
        let Some(client_id) = user.service_account_client_link else {
            return Ok(());
        };
        let key = service_account_key(user.realm_id, client_id);
        if BY_SERVICE_ACCOUNT.claim(&self.store, &key, user.id, None).await? {
            Ok(())
        } else {
            Err(StorageError::duplicate(
                "User",
                "service_account_client_link",
                client_id.to_string(),
            ))
        }
    }

    async fn write(&self, user: &User) -> StorageResult<()> {
        USERS
            .put(
                &self.store,
                &user.realm_id.to_string(),
                &user.id.to_string(),
                user,
                None,
            )
            .await
    }

    async fn load_many(
        &self,
        realm_id: Uuid,
        ids: Vec<Uuid>,
        keep: impl Fn(&User) -> bool + Send,
    ) -> StorageResult<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.get_by_id(realm_id, id).await?
                && keep(&user)
            {
                users.push(user);
            }
        }
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn matching(&self, realm_id: Uuid, criteria: &UserSearchCriteria) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = USERS.all(&self.store, &realm_id.to_string()).await?;
        users.retain(|u| criteria.matches(u));
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}

#[async_trait]
impl UserStore for ColumnUserStore {
    async fn create(&self, user: &User) -> StorageResult<()> {
        self.claim_username(user).await?;
        if let Err(e) = self.claim_service_account(user).await {
            let key = username_key(user.realm_id, &user.username);
            BY_USERNAME.release(&self.store, &key, user.id).await?;
            return Err(e);
        }
        self.write(user).await?;
        for (table, key) in multi_keys(user) {
            multi_index(table).add(&self.store, &key, user.id, None).await?;
        }
        Ok(())
    }

    async fn update(&self, previous: &User, user: &User) -> StorageResult<()> {
        let renamed = !previous.username.eq_ignore_ascii_case(&user.username);
        if renamed {
            self.claim_username(user).await?;
        }
        let relinked = previous.service_account_client_link != user.service_account_client_link;
        if relinked {
            self.claim_service_account(user).await?;
        }

        self.write(user).await?;

        if renamed {
            let old = username_key(previous.realm_id, &previous.username);
            BY_USERNAME.release(&self.store, &old, user.id).await?;
        }
        if relinked && let Some(client_id) = previous.service_account_client_link {
            let old = service_account_key(previous.realm_id, client_id);
            BY_SERVICE_ACCOUNT.release(&self.store, &old, user.id).await?;
        }

        let old_keys = multi_keys(previous);
        let new_keys = multi_keys(user);
        for (table, key) in old_keys.difference(&new_keys) {
            multi_index(*table).remove(&self.store, key, user.id).await?;
        }
        for (table, key) in new_keys.difference(&old_keys) {
            multi_index(*table).add(&self.store, key, user.id, None).await?;
        }
        Ok(())
    }

    async fn delete(&self, user: &User) -> StorageResult<bool> {
        let existed = USERS
            .remove(&self.store, &user.realm_id.to_string(), &user.id.to_string())
            .await?;
        let username = username_key(user.realm_id, &user.username);
        BY_USERNAME.release(&self.store, &username, user.id).await?;
        if let Some(client_id) = user.service_account_client_link {
            let key = service_account_key(user.realm_id, client_id);
            BY_SERVICE_ACCOUNT.release(&self.store, &key, user.id).await?;
        }
        for (table, key) in multi_keys(user) {
            multi_index(table).remove(&self.store, &key, user.id).await?;
        }
        Ok(existed)
    }

    async fn get_by_id(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<User>> {
        USERS
            .get(&self.store, &realm_id.to_string(), &id.to_string())
            .await
    }

    async fn get_by_username(&self, realm_id: Uuid, username: &str) -> StorageResult<Option<User>> {
        let key = username_key(realm_id, username);
        let Some(id) = BY_USERNAME.lookup(&self.store, &key).await? else {
            return Ok(None);
        };
        Ok(self
            .get_by_id(realm_id, id)
            .await?
            .filter(|u| u.username.eq_ignore_ascii_case(username)))
    }

    async fn get_by_email(&self, realm_id: Uuid, email: &str) -> StorageResult<Vec<User>> {
        let email = email.to_lowercase();
        let ids = BY_EMAIL
            .ids(&self.store, &key(&[&realm_id.to_string(), &email]))
            .await?;
        self.load_many(realm_id, ids, |u| {
            u.email.as_deref().is_some_and(|e| e.to_lowercase() == email)
        })
        .await
    }

    async fn get_by_federation_link(&self, realm_id: Uuid, link: &str) -> StorageResult<Vec<User>> {
        let ids = BY_FEDERATION_LINK
            .ids(&self.store, &key(&[&realm_id.to_string(), link]))
            .await?;
        self.load_many(realm_id, ids, |u| u.federation_link.as_deref() == Some(link))
            .await
    }

    async fn get_service_account(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
    ) -> StorageResult<Option<User>> {
        let key = service_account_key(realm_id, client_id);
        let Some(id) = BY_SERVICE_ACCOUNT.lookup(&self.store, &key).await? else {
            return Ok(None);
        };
        Ok(self
            .get_by_id(realm_id, id)
            .await?
            .filter(|u| u.service_account_client_link == Some(client_id)))
    }

    async fn get_by_attribute(
        &self,
        realm_id: Uuid,
        name: &str,
        value: &str,
    ) -> StorageResult<Vec<User>> {
        let ids = BY_ATTRIBUTE
            .ids(&self.store, &key(&[&realm_id.to_string(), name, value]))
            .await?;
        self.load_many(realm_id, ids, |u| u.has_attribute_value(name, value))
            .await
    }

    async fn search(
        &self,
        realm_id: Uuid,
        criteria: &UserSearchCriteria,
    ) -> StorageResult<Vec<User>> {
        let users = self.matching(realm_id, criteria).await?;
        Ok(paginate(users, criteria.first, criteria.max))
    }

    async fn count(&self, realm_id: Uuid, criteria: &UserSearchCriteria) -> StorageResult<u64> {
        let users = self.matching(realm_id, criteria).await?;
        Ok(users.len() as u64)
    }
}
