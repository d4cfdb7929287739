//! Brute-force protection records.

use std::sync::Arc;

use async_trait::async_trait;
use kc_model::LoginFailure;
use kc_repository::CompositeRepository;
use kc_spi::{Dirtyable, EntityCell, Flushable, Identifiable, KeycloakSession, UndoCreate, kinds};
use kc_storage::StorageResult;
use tracing::debug;
use uuid::Uuid;

/// Request-scoped view of the login failures of one user.
#[derive(Debug)]
pub struct LoginFailureAdapter {
    cell: EntityCell<LoginFailure>,
}

impl LoginFailureAdapter {
    /// User ID.
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.cell.read(|f| f.user_id)
    }

    /// Realm ID.
    #[must_use]
    pub fn realm_id(&self) -> Uuid {
        self.cell.read(|f| f.realm_id)
    }

    /// Consecutive failures.
    #[must_use]
    pub fn num_failures(&self) -> i32 {
        self.cell.read(|f| f.num_failures)
    }

    /// Temporary lockouts issued.
    #[must_use]
    pub fn num_temporary_lockouts(&self) -> i32 {
        self.cell.read(|f| f.num_temporary_lockouts)
    }

    /// Epoch millis before which logins are refused.
    #[must_use]
    pub fn failed_login_not_before(&self) -> i64 {
        self.cell.read(|f| f.failed_login_not_before)
    }

    /// Epoch millis of the last failure.
    #[must_use]
    pub fn last_failure(&self) -> i64 {
        self.cell.read(|f| f.last_failure)
    }

    /// IP address of the last failure.
    #[must_use]
    pub fn last_ip_failure(&self) -> Option<String> {
        self.cell.read(|f| f.last_ip_failure.clone())
    }

    /// Counts one more failure.
    pub fn increment_failures(&self) -> StorageResult<()> {
        self.cell.update(|f| f.num_failures += 1)
    }

    /// Counts one more temporary lockout.
    pub fn increment_temporary_lockouts(&self) -> StorageResult<()> {
        self.cell.update(|f| f.num_temporary_lockouts += 1)
    }

    /// Refuses logins until `millis`.
    pub fn set_failed_login_not_before(&self, millis: i64) -> StorageResult<()> {
        self.cell.update(|f| f.failed_login_not_before = millis)
    }

    /// Records when the last failure happened.
    pub fn set_last_failure(&self, millis: i64) -> StorageResult<()> {
        self.cell.update(|f| f.last_failure = millis)
    }

    /// Records where the last failure came from.
    pub fn set_last_ip_failure(&self, ip: impl Into<String>) -> StorageResult<()> {
        let ip = ip.into();
        self.cell.update(|f| f.last_ip_failure = Some(ip))
    }

    /// Resets every counter.
    pub fn clear_failures(&self) -> StorageResult<()> {
        self.cell.update(LoginFailure::clear)
    }
}

impl Identifiable for LoginFailureAdapter {
    fn kind(&self) -> &'static str {
        kinds::LOGIN_FAILURE
    }

    fn id(&self) -> Uuid {
        self.user_id()
    }
}

impl Dirtyable for LoginFailureAdapter {
    fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    fn mark_dirty(&self) {
        self.cell.mark_dirty();
    }
}

#[async_trait]
impl Flushable for LoginFailureAdapter {
    async fn flush(&self, repo: &CompositeRepository) -> StorageResult<bool> {
        let Some(write) = self.cell.pending() else {
            return Ok(false);
        };
        repo.upsert_login_failure(&write.current).await?;
        debug!(user_id = %write.current.user_id, "login failure flushed");
        self.cell.complete(write);
        Ok(true)
    }

    fn discard(&self) {
        self.cell.discard();
    }
}

/// Login failure operations of one request.
#[derive(Debug, Clone)]
pub struct LoginFailureProvider {
    session: Arc<KeycloakSession>,
}

impl LoginFailureProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new(session: Arc<KeycloakSession>) -> Self {
        Self { session }
    }

    fn wrap(&self, failure: LoginFailure) -> Arc<LoginFailureAdapter> {
        let registry = self.session.registry();
        if let Some(existing) =
            registry.get::<LoginFailureAdapter>(kinds::LOGIN_FAILURE, failure.user_id)
        {
            return existing;
        }
        registry.register(Arc::new(LoginFailureAdapter {
            cell: EntityCell::loaded(kinds::LOGIN_FAILURE, failure),
        }))
    }

    /// Gets the record of a user.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_user_login_failure(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
    ) -> StorageResult<Option<Arc<LoginFailureAdapter>>> {
        if let Some(adapter) = self
            .session
            .registry()
            .get::<LoginFailureAdapter>(kinds::LOGIN_FAILURE, user_id)
        {
            return Ok((adapter.realm_id() == realm_id).then_some(adapter));
        }
        let failure = self
            .session
            .repository()
            .get_login_failure(realm_id, user_id)
            .await?;
        Ok(failure.map(|f| self.wrap(f)))
    }

    /// Gets the record of a user, creating an empty one when missing.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn add_user_login_failure(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
    ) -> StorageResult<Arc<LoginFailureAdapter>> {
        self.session.ensure_open()?;
        if let Some(existing) = self.get_user_login_failure(realm_id, user_id).await? {
            return Ok(existing);
        }
        let failure = LoginFailure::new(realm_id, user_id);
        self.session
            .repository()
            .upsert_login_failure(&failure)
            .await?;
        self.session
            .register_compensation(UndoCreate::LoginFailure { realm_id, user_id });
        Ok(self.wrap(failure))
    }

    /// Removes the record of a user.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_user_login_failure(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
    ) -> StorageResult<bool> {
        self.session.ensure_open()?;
        self.session.registry().remove(kinds::LOGIN_FAILURE, user_id);
        self.session
            .repository()
            .delete_login_failure(realm_id, user_id)
            .await
    }

    /// Removes every record of a realm.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn remove_all_user_login_failures(&self, realm_id: Uuid) -> StorageResult<()> {
        self.session.ensure_open()?;
        for adapter in self.session.registry().adapters() {
            if adapter.kind() == kinds::LOGIN_FAILURE
                && let Some(failure) = self
                    .session
                    .registry()
                    .get::<LoginFailureAdapter>(kinds::LOGIN_FAILURE, adapter.id())
                && failure.realm_id() == realm_id
            {
                self.session
                    .registry()
                    .remove(kinds::LOGIN_FAILURE, adapter.id());
            }
        }
        self.session
            .repository()
            .delete_login_failures_by_realm(realm_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn add_returns_existing_record() {
        let harness = Harness::new();
        let provider = LoginFailureProvider::new(harness.session());
        let (realm_id, user_id) = (Uuid::now_v7(), Uuid::now_v7());

        let first = provider.add_user_login_failure(realm_id, user_id).await.unwrap();
        let second = provider.add_user_login_failure(realm_id, user_id).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn counters_persist_on_commit() {
        let harness = Harness::new();
        let session = harness.session();
        let provider = LoginFailureProvider::new(Arc::clone(&session));
        let (realm_id, user_id) = (Uuid::now_v7(), Uuid::now_v7());
        let failure = provider.add_user_login_failure(realm_id, user_id).await.unwrap();
        failure.increment_failures().unwrap();
        failure.increment_failures().unwrap();
        failure.set_last_ip_failure("10.0.0.7").unwrap();
        session.commit().await.unwrap();

        let provider = LoginFailureProvider::new(harness.session());
        let loaded = provider
            .get_user_login_failure(realm_id, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.num_failures(), 2);
        assert_eq!(loaded.last_ip_failure().as_deref(), Some("10.0.0.7"));

        loaded.clear_failures().unwrap();
        assert_eq!(loaded.num_failures(), 0);
    }

    #[tokio::test]
    async fn remove_all_in_realm() {
        let harness = Harness::new();
        let provider = LoginFailureProvider::new(harness.session());
        let realm_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        provider.add_user_login_failure(realm_id, user_id).await.unwrap();

        provider.remove_all_user_login_failures(realm_id).await.unwrap();

        assert!(
            provider
                .get_user_login_failure(realm_id, user_id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            !provider
                .remove_user_login_failure(realm_id, user_id)
                .await
                .unwrap()
        );
    }
}
