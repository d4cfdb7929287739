//! Event entity store trait.

use std::collections::BTreeSet;

use async_trait::async_trait;
use kc_model::{Event, EventType};
use serde::Serialize;
use uuid::Uuid;

use crate::error::StorageResult;

/// Store for login events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Writes an event with an optional time to live in seconds.
    async fn insert(&self, event: &Event, ttl: Option<i64>) -> StorageResult<()>;

    /// Queries the events of a realm, newest first.
    async fn query(&self, realm_id: Uuid, query: &EventQuery) -> StorageResult<Vec<Event>>;

    /// Deletes all events of a realm.
    async fn delete_by_realm(&self, realm_id: Uuid) -> StorageResult<()>;
}

/// Filter for event queries. Time bounds are inclusive epoch millis.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EventQuery {
    /// Accepted event types; empty accepts all.
    pub types: BTreeSet<EventType>,
    /// Filter by user.
    pub user_id: Option<Uuid>,
    /// Filter by client.
    pub client_id: Option<String>,
    /// Lower time bound.
    pub from_time: Option<i64>,
    /// Upper time bound.
    pub to_time: Option<i64>,
    /// Offset for pagination.
    pub first: Option<usize>,
    /// Maximum results to return.
    pub max: Option<usize>,
}

impl EventQuery {
    /// Creates an unfiltered query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            types: BTreeSet::new(),
            user_id: None,
            client_id: None,
            from_time: None,
            to_time: None,
            first: None,
            max: None,
        }
    }

    /// Accepts an event type.
    #[must_use]
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.types.insert(event_type);
        self
    }

    /// Filters by user.
    #[must_use]
    pub const fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Filters by client.
    #[must_use]
    pub fn client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Restricts to a time window.
    #[must_use]
    pub const fn between(mut self, from_time: i64, to_time: i64) -> Self {
        self.from_time = Some(from_time);
        self.to_time = Some(to_time);
        self
    }

    /// Sets offset and maximum results.
    #[must_use]
    pub const fn page(mut self, first: Option<usize>, max: Option<usize>) -> Self {
        self.first = first;
        self.max = max;
        self
    }

    /// Checks whether an event matches the filters (pagination excluded).
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        (self.types.is_empty() || self.types.contains(&event.event_type))
            && self.user_id.is_none_or(|u| event.user_id == Some(u))
            && self
                .client_id
                .as_deref()
                .is_none_or(|c| event.client_id.as_deref() == Some(c))
            && self.from_time.is_none_or(|t| event.time >= t)
            && self.to_time.is_none_or(|t| event.time <= t)
    }
}
