//! Client provider and adapter.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kc_model::{Client, Protocol};
use kc_repository::CompositeRepository;
use kc_spi::{Dirtyable, EntityCell, Flushable, Identifiable, KeycloakSession, UndoCreate, kinds};
use kc_storage::{ClientSearchCriteria, StorageError, StorageResult};
use tracing::debug;
use uuid::Uuid;

use crate::role::RoleProvider;
use crate::user::UserProvider;

/// Request-scoped view of one client.
#[derive(Debug)]
pub struct ClientAdapter {
    cell: EntityCell<Client>,
    repo: Arc<CompositeRepository>,
}

impl ClientAdapter {
    fn new(client: Client, repo: Arc<CompositeRepository>) -> Self {
        Self {
            cell: EntityCell::loaded(kinds::CLIENT, client),
            repo,
        }
    }

    fn modify(&self, f: impl FnOnce(&mut Client)) -> StorageResult<()> {
        self.cell.update(|client| {
            f(client);
            client.updated_at = Utc::now();
        })
    }

    // === Getters ===

    /// Internal ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.cell.read(|c| c.id)
    }

    /// Realm ID.
    #[must_use]
    pub fn realm_id(&self) -> Uuid {
        self.cell.read(|c| c.realm_id)
    }

    /// OAuth client identifier.
    #[must_use]
    pub fn client_id(&self) -> String {
        self.cell.read(|c| c.client_id.clone())
    }

    /// Whether the client is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cell.read(|c| c.enabled)
    }

    /// Protocol.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.cell.read(|c| c.protocol)
    }

    /// Attribute value.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.cell.read(|c| c.attributes.get(name).cloned())
    }

    /// Attribute read as a positive number of seconds.
    #[must_use]
    pub fn attribute_seconds(&self, name: &str) -> Option<i64> {
        self.cell.read(|c| c.attribute_seconds(name))
    }

    /// Copy of the current state.
    #[must_use]
    pub fn entity(&self) -> Client {
        self.cell.snapshot()
    }

    // === Setters ===

    /// Changes the OAuth client identifier.
    ///
    /// # Errors
    ///
    /// Duplicate when another client of the realm uses it, store failure, or
    /// invalid state when the adapter was discarded.
    pub async fn set_client_id(&self, client_id: &str) -> StorageResult<()> {
        self.cell.ensure_live()?;
        let (realm_id, id) = self.cell.read(|c| (c.realm_id, c.id));
        if let Some(other) = self
            .repo
            .get_client_by_client_id(realm_id, client_id)
            .await?
            && other.id != id
        {
            return Err(StorageError::duplicate("Client", "client_id", client_id));
        }
        self.modify(|c| c.client_id = client_id.to_string())
    }

    /// Sets the display name.
    pub fn set_name(&self, name: Option<String>) -> StorageResult<()> {
        self.modify(|c| c.name = name)
    }

    /// Sets the description.
    pub fn set_description(&self, description: Option<String>) -> StorageResult<()> {
        self.modify(|c| c.description = description)
    }

    /// Enables or disables the client.
    pub fn set_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.modify(|c| c.enabled = enabled)
    }

    /// Sets the protocol.
    pub fn set_protocol(&self, protocol: Protocol) -> StorageResult<()> {
        self.modify(|c| c.protocol = protocol)
    }

    /// Makes the client public or confidential.
    pub fn set_public_client(&self, public: bool) -> StorageResult<()> {
        self.modify(|c| c.public_client = public)
    }

    /// Sets the client secret.
    pub fn set_secret(&self, secret: Option<String>) -> StorageResult<()> {
        self.modify(|c| c.secret = secret)
    }

    /// Adds a redirect URI.
    pub fn add_redirect_uri(&self, uri: &str) -> StorageResult<()> {
        self.modify(|c| {
            c.redirect_uris.insert(uri.to_string());
        })
    }

    /// Removes a redirect URI.
    pub fn remove_redirect_uri(&self, uri: &str) -> StorageResult<()> {
        self.modify(|c| {
            c.redirect_uris.remove(uri);
        })
    }

    /// Adds a web origin.
    pub fn add_web_origin(&self, origin: &str) -> StorageResult<()> {
        self.modify(|c| {
            c.web_origins.insert(origin.to_string());
        })
    }

    /// Removes a web origin.
    pub fn remove_web_origin(&self, origin: &str) -> StorageResult<()> {
        self.modify(|c| {
            c.web_origins.remove(origin);
        })
    }

    /// Sets an attribute, e.g. one of the client session timeouts.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) -> StorageResult<()> {
        let value = value.into();
        self.modify(|c| {
            c.attributes.insert(name.to_string(), value);
        })
    }

    /// Removes an attribute.
    pub fn remove_attribute(&self, name: &str) -> StorageResult<()> {
        self.modify(|c| {
            c.attributes.remove(name);
        })
    }
}

impl Identifiable for ClientAdapter {
    fn kind(&self) -> &'static str {
        kinds::CLIENT
    }

    fn id(&self) -> Uuid {
        Self::id(self)
    }
}

impl Dirtyable for ClientAdapter {
    fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    fn mark_dirty(&self) {
        self.cell.mark_dirty();
    }
}

#[async_trait]
impl Flushable for ClientAdapter {
    async fn flush(&self, repo: &CompositeRepository) -> StorageResult<bool> {
        let Some(write) = self.cell.pending() else {
            return Ok(false);
        };
        match &write.previous {
            Some(previous) => repo.update_client(previous, &write.current).await?,
            None => repo.create_client(&write.current).await?,
        }
        debug!(client_id = %write.current.id, "client flushed");
        self.cell.complete(write);
        Ok(true)
    }

    fn discard(&self) {
        self.cell.discard();
    }
}

/// Client operations of one request.
#[derive(Debug, Clone)]
pub struct ClientProvider {
    session: Arc<KeycloakSession>,
}

impl ClientProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    fn wrap(&self, client: Client) -> Arc<ClientAdapter> {
        let registry = self.session.registry();
        if let Some(existing) = registry.get::<ClientAdapter>(kinds::CLIENT, client.id) {
            return existing;
        }
        registry.register(Arc::new(ClientAdapter::new(
            client,
            Arc::clone(self.session.repository()),
        )))
    }

    /// Adds a client.
    ///
    /// # Errors
    ///
    /// Duplicate when the `client_id` is taken, or store failure.
    pub async fn add_client(
        &self,
        realm_id: Uuid,
        id: Option<Uuid>,
        client_id: &str,
    ) -> StorageResult<Arc<ClientAdapter>> {
        self.session.ensure_open()?;
        let client = Client::with_id(id.unwrap_or_else(Uuid::now_v7), realm_id, client_id);
        self.session.repository().create_client(&client).await?;
        self.session
            .register_compensation(UndoCreate::Client(client.clone()));
        debug!(%realm_id, client_id, "client added");
        Ok(self.wrap(client))
    }

    /// Gets a client by internal ID.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_client_by_id(
        &self,
        realm_id: Uuid,
        id: Uuid,
    ) -> StorageResult<Option<Arc<ClientAdapter>>> {
        if let Some(adapter) = self
            .session
            .registry()
            .get::<ClientAdapter>(kinds::CLIENT, id)
        {
            return Ok((adapter.realm_id() == realm_id).then_some(adapter));
        }
        let client = self.session.repository().get_client(realm_id, id).await?;
        Ok(client.map(|c| self.wrap(c)))
    }

    /// Gets a client by OAuth client identifier.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_client_by_client_id(
        &self,
        realm_id: Uuid,
        client_id: &str,
    ) -> StorageResult<Option<Arc<ClientAdapter>>> {
        let client = self
            .session
            .repository()
            .get_client_by_client_id(realm_id, client_id)
            .await?;
        Ok(client
            .map(|c| self.wrap(c))
            .filter(|adapter| adapter.client_id() == client_id))
    }

    async fn search(
        &self,
        realm_id: Uuid,
        criteria: &ClientSearchCriteria,
    ) -> StorageResult<Vec<Arc<ClientAdapter>>> {
        let clients = self
            .session
            .repository()
            .search_clients(realm_id, criteria)
            .await?;
        Ok(clients.into_iter().map(|c| self.wrap(c)).collect())
    }

    /// Lists clients ordered by `client_id`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_clients(
        &self,
        realm_id: Uuid,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<Arc<ClientAdapter>>> {
        self.search(realm_id, &ClientSearchCriteria::new().page(first, max))
            .await
    }

    /// Searches clients by `client_id` fragment, case-insensitively.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn search_clients_by_client_id(
        &self,
        realm_id: Uuid,
        fragment: &str,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<Arc<ClientAdapter>>> {
        let criteria = ClientSearchCriteria::new()
            .client_id(fragment)
            .page(first, max);
        self.search(realm_id, &criteria).await
    }

    /// Searches clients having every given attribute value.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn search_clients_by_attributes(
        &self,
        realm_id: Uuid,
        attributes: BTreeMap<String, String>,
        first: Option<usize>,
        max: Option<usize>,
    ) -> StorageResult<Vec<Arc<ClientAdapter>>> {
        let mut criteria = ClientSearchCriteria::new().page(first, max);
        criteria.attributes = attributes;
        self.search(realm_id, &criteria).await
    }

    /// Counts the clients of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_clients_count(&self, realm_id: Uuid) -> StorageResult<u64> {
        self.session.repository().count_clients(realm_id).await
    }

    /// Removes a client with its roles and service account.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_client(&self, realm_id: Uuid, id: Uuid) -> StorageResult<bool> {
        self.session.ensure_open()?;
        let Some(adapter) = self.get_client_by_id(realm_id, id).await? else {
            return Ok(false);
        };
        self.remove_adapter(&adapter).await
    }

    async fn remove_adapter(&self, adapter: &ClientAdapter) -> StorageResult<bool> {
        let (realm_id, id) = (adapter.realm_id(), adapter.id());
        RoleProvider::new(Arc::clone(&self.session))
            .remove_client_roles(realm_id, id)
            .await?;
        let users = UserProvider::new(Arc::clone(&self.session));
        if let Some(service_account) = users.get_service_account(realm_id, id).await? {
            users.remove_user(realm_id, service_account.id()).await?;
        }

        let stored = adapter.cell.persisted().unwrap_or_else(|| adapter.entity());
        let removed = self.session.repository().delete_client(&stored).await?;
        self.session.registry().remove(kinds::CLIENT, id);
        debug!(%realm_id, client_id = %id, "client removed");
        Ok(removed)
    }

    /// Removes every client of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_clients(&self, realm_id: Uuid) -> StorageResult<()> {
        for client in self.get_clients(realm_id, None, None).await? {
            self.remove_adapter(&client).await?;
        }
        Ok(())
    }
}
