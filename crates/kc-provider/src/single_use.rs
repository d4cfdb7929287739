//! Single-use objects: action tokens, code-to-token payloads.
//!
//! Objects are written straight through to the store and never adapted.
//! Expiry is enforced twice: by the store TTL and by a check on read, so an
//! object whose TTL has not been swept yet is still reported as absent.

use std::collections::HashMap;
use std::sync::Arc;

use kc_model::SingleUseObject;
use kc_spi::KeycloakSession;
use kc_storage::StorageResult;
use tracing::debug;

/// Single-use object operations of one request.
#[derive(Debug, Clone)]
pub struct SingleUseObjectProvider {
    session: Arc<KeycloakSession>,
}

impl SingleUseObjectProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    fn now(&self) -> i64 {
        self.session.clock().current_time()
    }

    /// Stores `notes` under `key` for `lifespan_seconds`, replacing any
    /// previous value.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn put(
        &self,
        key: &str,
        lifespan_seconds: i64,
        notes: HashMap<String, String>,
    ) -> StorageResult<()> {
        self.session.ensure_open()?;
        let object = SingleUseObject::new(key, lifespan_seconds, notes, self.now());
        self.session
            .repository()
            .put_single_use_object(&object, lifespan_seconds)
            .await
    }

    /// Gets the notes stored under `key`.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get(&self, key: &str) -> StorageResult<Option<HashMap<String, String>>> {
        Ok(self.live(key).await?.map(|object| object.notes))
    }

    async fn live(&self, key: &str) -> StorageResult<Option<SingleUseObject>> {
        let object = self.session.repository().get_single_use_object(key).await?;
        Ok(object.filter(|o| {
            let expired = o.is_expired_at(self.now());
            if expired {
                debug!(key, "single-use object expired");
            }
            !expired
        }))
    }

    /// Removes `key`, returning the notes it held.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove(&self, key: &str) -> StorageResult<Option<HashMap<String, String>>> {
        self.session.ensure_open()?;
        let Some(object) = self.live(key).await? else {
            return Ok(None);
        };
        if self.session.repository().delete_single_use_object(key).await? {
            Ok(Some(object.notes))
        } else {
            Ok(None)
        }
    }

    /// Replaces the notes under an existing `key`, keeping its expiry.
    /// Returns whether the key existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn replace(
        &self,
        key: &str,
        notes: HashMap<String, String>,
    ) -> StorageResult<bool> {
        self.session.ensure_open()?;
        let Some(mut object) = self.live(key).await? else {
            return Ok(false);
        };
        let remaining = object.expiration - self.now();
        object.notes = notes;
        self.session
            .repository()
            .put_single_use_object(&object, remaining)
            .await?;
        Ok(true)
    }

    /// Stores an empty object under `key` unless it is taken. Returns
    /// whether it was stored.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn put_if_absent(&self, key: &str, lifespan_seconds: i64) -> StorageResult<bool> {
        self.session.ensure_open()?;
        let object = SingleUseObject::new(key, lifespan_seconds, HashMap::new(), self.now());
        self.session
            .repository()
            .put_single_use_object_if_absent(&object, lifespan_seconds)
            .await
    }

    /// Whether `key` holds a live object.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.live(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;

    fn notes(value: &str) -> HashMap<String, String> {
        HashMap::from([("code".to_string(), value.to_string())])
    }

    #[tokio::test]
    async fn remove_returns_notes_once() {
        let harness = Harness::new();
        let provider = SingleUseObjectProvider::new(harness.session());
        provider.put("code-1", 60, notes("abc")).await.unwrap();

        let removed = provider.remove("code-1").await.unwrap();
        assert_eq!(removed, Some(notes("abc")));

        let provider = SingleUseObjectProvider::new(harness.session());
        assert_eq!(provider.remove("code-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_if_absent_rejects_taken_key() {
        let harness = Harness::new();
        let provider = SingleUseObjectProvider::new(harness.session());

        assert!(provider.put_if_absent("token", 60).await.unwrap());
        assert!(!provider.put_if_absent("token", 60).await.unwrap());
        assert!(provider.contains("token").await.unwrap());
    }

    #[tokio::test]
    async fn expired_object_is_absent() {
        let harness = Harness::new();
        let provider = SingleUseObjectProvider::new(harness.session());
        provider.put("short", 10, notes("x")).await.unwrap();

        harness.clock.advance(11);

        let provider = SingleUseObjectProvider::new(harness.session());
        assert!(!provider.contains("short").await.unwrap());
        assert!(!provider.replace("short", notes("y")).await.unwrap());
    }

    #[tokio::test]
    async fn replace_keeps_expiry() {
        let harness = Harness::new();
        let provider = SingleUseObjectProvider::new(harness.session());
        provider.put("k", 30, notes("old")).await.unwrap();
        harness.clock.advance(20);

        assert!(provider.replace("k", notes("new")).await.unwrap());

        harness.clock.advance(11);
        let provider = SingleUseObjectProvider::new(harness.session());
        assert_eq!(provider.get("k").await.unwrap(), None);
    }
}
