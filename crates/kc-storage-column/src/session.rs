//! Column-store user session store.
//!
//! Index partitions are split by mode so online and offline lookups never
//! see each other's rows. Index rows carry the same TTL as the session.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use kc_model::UserSession;
use kc_storage::{StorageResult, UserSessionStore};
use uuid::Uuid;

use crate::boundary::ColumnStore;
use crate::index::{MultiIndex, key};
use crate::schema;
use crate::table::Table;

const SESSIONS: Table = Table::new(schema::USER_SESSIONS);
const BY_USER: MultiIndex = MultiIndex::new(schema::USER_SESSIONS_BY_USER);
const BY_BROKER_SESSION: MultiIndex = MultiIndex::new(schema::USER_SESSIONS_BY_BROKER_SESSION);
const BY_BROKER_USER: MultiIndex = MultiIndex::new(schema::USER_SESSIONS_BY_BROKER_USER);
const BY_CLIENT: MultiIndex = MultiIndex::new(schema::USER_SESSIONS_BY_CLIENT);

const fn mode(offline: bool) -> &'static str {
    if offline { "offline" } else { "online" }
}

fn index_key(realm_id: Uuid, offline: bool, value: &str) -> String {
    key(&[&realm_id.to_string(), mode(offline), value])
}

fn index(table: &'static str) -> MultiIndex {
    match table {
        schema::USER_SESSIONS_BY_USER => BY_USER,
        schema::USER_SESSIONS_BY_BROKER_SESSION => BY_BROKER_SESSION,
        schema::USER_SESSIONS_BY_BROKER_USER => BY_BROKER_USER,
        _ => BY_CLIENT,
    }
}

/// Index rows a session owns.
fn index_keys(session: &UserSession) -> BTreeSet<(&'static str, String)> {
    let (realm, offline) = (session.realm_id, session.offline);
    let mut keys = BTreeSet::new();
    keys.insert((
        schema::USER_SESSIONS_BY_USER,
        index_key(realm, offline, &session.user_id.to_string()),
    ));
    if let Some(broker_session) = &session.broker_session_id {
        keys.insert((
            schema::USER_SESSIONS_BY_BROKER_SESSION,
            index_key(realm, offline, broker_session),
        ));
    }
    if let Some(broker_user) = &session.broker_user_id {
        keys.insert((
            schema::USER_SESSIONS_BY_BROKER_USER,
            index_key(realm, offline, broker_user),
        ));
    }
    for client_id in session.client_sessions.keys() {
        keys.insert((
            schema::USER_SESSIONS_BY_CLIENT,
            index_key(realm, offline, &client_id.to_string()),
        ));
    }
    keys
}

/// User session store over a [`ColumnStore`].
pub struct ColumnUserSessionStore {
    store: Arc<dyn ColumnStore>,
}

impl ColumnUserSessionStore {
    /// Creates a user session store.
    #[must_use]
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self { store }
    }

    async fn follow(
        &self,
        table: &'static str,
        realm_id: Uuid,
        offline: bool,
        value: &str,
        keep: impl Fn(&UserSession) -> bool + Send,
    ) -> StorageResult<Vec<UserSession>> {
        let ids = index(table)
            .ids(&self.store, &index_key(realm_id, offline, value))
            .await?;
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.get(realm_id, id).await?
                && session.offline == offline
                && keep(&session)
            {
                sessions.push(session);
            }
        }
        sessions.sort_by_key(|s| (s.started, s.id));
        Ok(sessions)
    }
}

#[async_trait]
impl UserSessionStore for ColumnUserSessionStore {
    async fn upsert(
        &self,
        previous: Option<&UserSession>,
        session: &UserSession,
        ttl: Option<i64>,
    ) -> StorageResult<()> {
        SESSIONS
            .put(
                &self.store,
                &session.realm_id.to_string(),
                &session.id.to_string(),
                session,
                ttl,
            )
            .await?;

        let keys = index_keys(session);
        if let Some(previous) = previous {
            for (table, key) in index_keys(previous).difference(&keys) {
                index(*table).remove(&self.store, key, session.id).await?;
            }
        }
        for (table, key) in &keys {
            index(*table).add(&self.store, key, session.id, ttl).await?;
        }
        Ok(())
    }

    async fn delete(&self, session: &UserSession) -> StorageResult<bool> {
        let existed = SESSIONS
            .remove(
                &self.store,
                &session.realm_id.to_string(),
                &session.id.to_string(),
            )
            .await?;
        for (table, key) in index_keys(session) {
            index(table).remove(&self.store, &key, session.id).await?;
        }
        Ok(existed)
    }

    async fn get(&self, realm_id: Uuid, id: Uuid) -> StorageResult<Option<UserSession>> {
        SESSIONS
            .get(&self.store, &realm_id.to_string(), &id.to_string())
            .await
    }

    async fn find_by_realm(&self, realm_id: Uuid, offline: bool) -> StorageResult<Vec<UserSession>> {
        let mut sessions: Vec<UserSession> =
            SESSIONS.all(&self.store, &realm_id.to_string()).await?;
        sessions.retain(|s| s.offline == offline);
        sessions.sort_by_key(|s| (s.started, s.id));
        Ok(sessions)
    }

    async fn find_by_user(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.follow(
            schema::USER_SESSIONS_BY_USER,
            realm_id,
            offline,
            &user_id.to_string(),
            |s| s.user_id == user_id,
        )
        .await
    }

    async fn find_by_broker_session(
        &self,
        realm_id: Uuid,
        broker_session_id: &str,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.follow(
            schema::USER_SESSIONS_BY_BROKER_SESSION,
            realm_id,
            offline,
            broker_session_id,
            |s| s.broker_session_id.as_deref() == Some(broker_session_id),
        )
        .await
    }

    async fn find_by_broker_user(
        &self,
        realm_id: Uuid,
        broker_user_id: &str,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.follow(
            schema::USER_SESSIONS_BY_BROKER_USER,
            realm_id,
            offline,
            broker_user_id,
            |s| s.broker_user_id.as_deref() == Some(broker_user_id),
        )
        .await
    }

    async fn find_by_client(
        &self,
        realm_id: Uuid,
        client_id: Uuid,
        offline: bool,
    ) -> StorageResult<Vec<UserSession>> {
        self.follow(
            schema::USER_SESSIONS_BY_CLIENT,
            realm_id,
            offline,
            &client_id.to_string(),
            |s| s.client_sessions.contains_key(&client_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use kc_core::Clock;
    use kc_model::AuthenticatedClientSession;

    use super::*;
    use crate::InMemoryKeyspace;

    fn session(realm_id: Uuid, user_id: Uuid, now: i64) -> UserSession {
        UserSession::new(realm_id, user_id, "alice", now)
    }

    #[tokio::test]
    async fn client_index_follows_client_sessions() {
        let store = ColumnUserSessionStore::new(Arc::new(InMemoryKeyspace::new(Clock::new())));
        let (realm_id, user_id, client_id) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());

        let before = session(realm_id, user_id, 100);
        store.upsert(None, &before, None).await.unwrap();
        assert!(store.find_by_client(realm_id, client_id, false).await.unwrap().is_empty());

        let mut after = before.clone();
        after
            .client_sessions
            .insert(client_id, AuthenticatedClientSession::new(client_id, false, 100));
        store.upsert(Some(&before), &after, None).await.unwrap();
        assert_eq!(store.find_by_client(realm_id, client_id, false).await.unwrap().len(), 1);

        store.upsert(Some(&after), &before, None).await.unwrap();
        assert!(store.find_by_client(realm_id, client_id, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn online_and_offline_indexes_are_separate() {
        let store = ColumnUserSessionStore::new(Arc::new(InMemoryKeyspace::new(Clock::new())));
        let (realm_id, user_id) = (Uuid::now_v7(), Uuid::now_v7());

        let online = session(realm_id, user_id, 100);
        let offline = online.to_offline(100);
        store.upsert(None, &online, None).await.unwrap();
        store.upsert(None, &offline, None).await.unwrap();

        let found = store.find_by_user(realm_id, user_id, true).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, offline.id);
        assert_eq!(store.find_by_realm(realm_id, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ttl_expires_session_and_index() {
        let clock = Clock::new();
        let store = ColumnUserSessionStore::new(Arc::new(InMemoryKeyspace::new(clock.clone())));
        let (realm_id, user_id) = (Uuid::now_v7(), Uuid::now_v7());
        let s = session(realm_id, user_id, clock.current_time());
        store.upsert(None, &s, Some(60)).await.unwrap();

        clock.advance(61);
        assert!(store.get(realm_id, s.id).await.unwrap().is_none());
        assert!(store.find_by_user(realm_id, user_id, false).await.unwrap().is_empty());
    }
}
