//! Request session: the unit of work of one request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kc_core::{Clock, Config};
use kc_repository::CompositeRepository;
use kc_storage::{StorageError, StorageResult};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapter::Flushable;
use crate::registry::AdapterRegistry;
use crate::transaction::{Compensation, Transaction};

/// One request against the store.
///
/// Owns everything request-scoped: the composite repository with its
/// cache, the adapter registry and the compensation log. Providers borrow
/// it for the whole request; the host ends it with [`commit`] or
/// [`rollback`].
///
/// [`commit`]: KeycloakSession::commit
/// [`rollback`]: KeycloakSession::rollback
#[derive(Debug)]
pub struct KeycloakSession {
    id: Uuid,
    repo: Arc<CompositeRepository>,
    registry: AdapterRegistry,
    transaction: Transaction,
    clock: Clock,
    config: Arc<Config>,
    closed: AtomicBool,
}

impl KeycloakSession {
    /// Creates a session.
    #[must_use]
    pub fn new(repo: Arc<CompositeRepository>, clock: Clock, config: Arc<Config>) -> Self {
        Self {
            id: Uuid::now_v7(),
            repo,
            registry: AdapterRegistry::new(),
            transaction: Transaction::new(),
            clock,
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Session ID, for logging.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The composite repository of this request.
    #[must_use]
    pub const fn repository(&self) -> &Arc<CompositeRepository> {
        &self.repo
    }

    /// Adapters live in this request.
    #[must_use]
    pub const fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Time source.
    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Provider options.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Records an undo action for rollback.
    pub fn register_compensation(&self, compensation: impl Compensation + 'static) {
        self.transaction.register(compensation);
    }

    /// Whether the request has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fails once the request has ended.
    ///
    /// # Errors
    ///
    /// Invalid state after commit or rollback.
    pub fn ensure_open(&self) -> StorageResult<()> {
        if self.is_closed() {
            return Err(StorageError::invalid_state(format!(
                "request {} already ended",
                self.id
            )));
        }
        Ok(())
    }

    /// Flushes every dirty adapter, then ends the request.
    ///
    /// Stops at the first failing write and leaves the request open so the
    /// host can call [`rollback`](Self::rollback).
    ///
    /// # Errors
    ///
    /// The first write failure.
    pub async fn commit(&self) -> StorageResult<()> {
        self.ensure_open()?;
        let adapters = self.registry.adapters();
        let mut written = 0_usize;
        for adapter in adapters {
            if adapter.flush(&self.repo).await? {
                written += 1;
            }
        }
        debug!(session = %self.id, written, "request committed");

        self.transaction.clear();
        self.end();
        Ok(())
    }

    /// Discards every adapter and runs the compensations newest first.
    ///
    /// Every compensation runs even when an earlier one fails.
    ///
    /// # Errors
    ///
    /// The first compensation failure.
    pub async fn rollback(&self) -> StorageResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        let discarded = self.registry.drain();
        for adapter in &discarded {
            adapter.discard();
        }

        let mut first_error = None;
        for compensation in self.transaction.take_reversed() {
            if let Err(err) = compensation.compensate(&self.repo).await {
                warn!(session = %self.id, ?compensation, error = %err, "compensation failed");
                first_error.get_or_insert(err);
            }
        }
        debug!(session = %self.id, discarded = discarded.len(), "request rolled back");

        self.end();
        first_error.map_or(Ok(()), Err)
    }

    fn end(&self) {
        for adapter in self.registry.drain() {
            adapter.discard();
        }
        self.repo.close();
        self.closed.store(true, Ordering::Release);
    }
}

impl Drop for KeycloakSession {
    fn drop(&mut self) {
        if !self.is_closed() {
            let pending = self.registry.dirty_count();
            if pending > 0 || !self.transaction.is_empty() {
                warn!(session = %self.id, pending, "request dropped without commit or rollback");
            }
        }
    }
}
