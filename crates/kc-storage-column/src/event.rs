//! Column-store event store.

use std::sync::Arc;

use async_trait::async_trait;
use kc_model::Event;
use kc_storage::{EventQuery, EventStore, StorageResult};
use uuid::Uuid;

use crate::boundary::ColumnStore;
use crate::schema;
use crate::table::{Table, paginate};

const EVENTS: Table = Table::new(schema::EVENTS);

/// Event store over a [`ColumnStore`].
///
/// Clustering keys start with the zero-padded event time, so a partition
/// reads in chronological order.
pub struct ColumnEventStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnEventStore {
    /// Creates an event store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventStore for ColumnEventStore {
    async fn insert(&self, event: &Event, ttl: Option<i64>) -> StorageResult<()> {
        let clustering = format!("{:020}:{}", event.time.max(0), event.id);
        EVENTS
            .put(
                &self.store,
                &event.realm_id.to_string(),
                &clustering,
                event,
                ttl,
            )
            .await
    }

    async fn query(&self, realm_id: Uuid, query: &EventQuery) -> StorageResult<Vec<Event>> {
        let mut events: Vec<Event> = EVENTS.all(&self.store, &realm_id.to_string()).await?;
        events.retain(|e| query.matches(e));
        events.reverse();
        Ok(paginate(events, query.first, query.max))
    }

    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<()> {
        EVENTS
            .remove_partition(&self.store, &realm_id.to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use kc_core::Clock;
    use kc_model::EventType;

    use super::*;
    use crate::InMemoryKeyspace;

    #[tokio::test]
    async fn query_returns_newest_first() {
        let store = ColumnEventStore::new(Arc::new(InMemoryKeyspace::new(Clock::new())));
        let realm_id = Uuid::now_v7();
        for time in [300, 100, 200] {
            let event = Event::builder(EventType::Login, realm_id).build(time);
            store.insert(&event, None).await.unwrap();
        }

        let events = store.query(realm_id, &EventQuery::new()).await.unwrap();
        let times: Vec<i64> = events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![300, 200, 100]);

        store.delete_by_realm(realm_id).await.unwrap();
        assert!(store.query(realm_id, &EventQuery::new()).await.unwrap().is_empty());
    }
}
