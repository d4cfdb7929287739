//! Client entity store trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kc_model::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StorageResult;

/// Store for clients.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Creates a new client.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a client with the same `client_id` exists.
    async fn create(&self, client: &Client) -> StorageResult<()>;

    /// Writes a changed client, re-indexing `client_id` from `previous`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a changed `client_id` is taken.
    async fn update(&self, previous: &Client, client: &Client) -> StorageResult<()>;

    /// Deletes a client and its index rows. Returns whether it existed.
    async fn delete(&self, client: &Client) -> StorageResult<bool>;

    /// Gets a client by internal ID.
    async fn get_by_id(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<Client>>;

    /// Gets a client by `client_id` (OAuth client identifier).
    async fn get_by_client_id(
        &self,
        realm_id: Uuid,
        client_id: &str,
    ) -> StorageResult<Option<Client>>;

    /// Searches for clients matching criteria, ordered by `client_id`.
    async fn search(
        &self,
        realm_id: Uuid,
        criteria: &ClientSearchCriteria,
    ) -> StorageResult<Vec<Client>>;

    /// Counts clients in a realm.
    async fn count(&self, realm_id: Uuid) -> StorageResult<u64>;
}

/// Search criteria for clients.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ClientSearchCriteria {
    /// Case-insensitive `client_id` fragment.
    pub client_id: Option<String>,
    /// Attributes that must all match exactly.
    pub attributes: BTreeMap<String, String>,
    /// Offset for pagination.
    pub first: Option<usize>,
    /// Maximum results to return.
    pub max: Option<usize>,
}

impl ClientSearchCriteria {
    /// Creates a new search criteria.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            client_id: None,
            attributes: BTreeMap::new(),
            first: None,
            max: None,
        }
    }

    /// Filters by `client_id` fragment.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Requires an attribute value.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets offset and maximum results.
    #[must_use]
    pub const fn page(mut self, first: Option<usize>, max: Option<usize>) -> Self {
        self.first = first;
        self.max = max;
        self
    }

    /// Checks whether a client matches the filters (pagination excluded).
    #[must_use]
    pub fn matches(&self, client: &Client) -> bool {
        let id_matches = self.client_id.as_deref().is_none_or(|fragment| {
            client
                .client_id
                .to_lowercase()
                .contains(&fragment.to_lowercase())
        });
        id_matches
            && self
                .attributes
                .iter()
                .all(|(name, value)| client.attributes.get(name) == Some(value))
    }
}
