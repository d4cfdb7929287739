use kc_model::Event;
use kc_storage::{EventQuery, StorageResult};
use uuid::Uuid;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Stores an event.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn insert_event(&self, event: &Event, ttl: Option<i64>) -> StorageResult<()> {
        self.cache
            .intercept_write(tags::INSERT_EVENT, self.stores.events.insert(event, ttl))
            .await
    }

    /// Deletes every event of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_events_by_realm(&self, realm_id: Uuid) -> StorageResult<()> {
        self.cache
            .intercept_write(
                tags::DELETE_EVENTS_BY_REALM,
                self.stores.events.delete_by_realm(realm_id),
            )
            .await
    }

    /// Queries the events of a realm, newest first.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn query_events(&self, realm_id: Uuid, query: &EventQuery) -> StorageResult<Vec<Event>> {
        self.cache
            .intercept_read(
                tags::QUERY_EVENTS,
                &(realm_id, query),
                self.stores.events.query(realm_id, query),
            )
            .await
    }
}
