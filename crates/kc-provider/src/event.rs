//! Event store provider.

use std::sync::Arc;

use kc_model::Event;
use kc_spi::KeycloakSession;
use kc_storage::{EventQuery, StorageResult};
use tracing::debug;
use uuid::Uuid;

use crate::realm::RealmProvider;

/// Stores and queries login events of one request.
#[derive(Debug, Clone)]
pub struct EventStoreProvider {
    session: Arc<KeycloakSession>,
}

impl EventStoreProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    /// Records an event when its realm has events enabled. Returns whether
    /// it was stored.
    ///
    /// Events expire after the realm's `events_expiration` when positive.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn on_event(&self, event: &Event) -> StorageResult<bool> {
        self.session.ensure_open()?;
        let realms = RealmProvider::new(Arc::clone(&self.session));
        let Some(realm) = realms.get_realm(event.realm_id).await? else {
            debug!(realm_id = %event.realm_id, "event for unknown realm dropped");
            return Ok(false);
        };
        let realm = realm.entity();
        if !realm.events_enabled {
            return Ok(false);
        }
        let ttl = (realm.events_expiration > 0).then_some(realm.events_expiration);
        self.session.repository().insert_event(event, ttl).await?;
        Ok(true)
    }

    /// Events of a realm matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn query(&self, realm_id: Uuid, query: &EventQuery) -> StorageResult<Vec<Event>> {
        self.session.repository().query_events(realm_id, query).await
    }

    /// Removes every event of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn clear(&self, realm_id: Uuid) -> StorageResult<()> {
        self.session.ensure_open()?;
        self.session.repository().delete_events_by_realm(realm_id).await
    }
}
