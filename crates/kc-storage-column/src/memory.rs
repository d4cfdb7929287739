//! In-process keyspace implementing [`ColumnStore`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use kc_core::Clock;
use kc_storage::{StorageError, StorageResult};

use crate::boundary::{ColumnStore, Row};

#[derive(Debug, Clone)]
struct Cell {
    value: Vec<u8>,
    expires_at: Option<i64>,
}

impl Cell {
    fn new(value: Vec<u8>, ttl: Option<i64>, now: i64) -> Self {
        Self {
            value,
            expires_at: ttl.filter(|t| *t > 0).map(|t| now.saturating_add(t)),
        }
    }

    fn is_live(&self, now: i64) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

type PartitionKey = (String, String);

/// Keyspace held in memory, with TTL evaluated against a [`Clock`].
///
/// Counts reads and writes so tests can tell whether a call reached the
/// store, and can be switched unavailable to simulate store failures.
#[derive(Debug, Default)]
pub struct InMemoryKeyspace {
    partitions: DashMap<PartitionKey, BTreeMap<String, Cell>>,
    clock: Clock,
    reads: AtomicU64,
    writes: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryKeyspace {
    /// Creates an empty keyspace.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    /// Number of read calls served so far.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of write calls served so far.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Makes every following call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Number of live rows in a table.
    #[must_use]
    pub fn live_rows(&self, table: &str) -> usize {
        let now = self.clock.current_time();
        self.partitions
            .iter()
            .filter(|entry| entry.key().0 == table)
            .map(|entry| entry.value().values().filter(|c| c.is_live(now)).count())
            .sum()
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StorageError::store("keyspace unavailable"));
        }
        Ok(())
    }

    fn begin_read(&self) -> StorageResult<i64> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.clock.current_time())
    }

    fn begin_write(&self) -> StorageResult<i64> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(self.clock.current_time())
    }

    fn key(table: &str, partition: &str) -> PartitionKey {
        (table.to_owned(), partition.to_owned())
    }
}

#[async_trait]
impl ColumnStore for InMemoryKeyspace {
    async fn insert(
        &self,
        table: &str,
        partition: &str,
        clustering: &str,
        value: Vec<u8>,
        ttl: Option<i64>,
    ) -> StorageResult<()> {
        let now = self.begin_write()?;
        self.partitions
            .entry(Self::key(table, partition))
            .or_default()
            .insert(clustering.to_owned(), Cell::new(value, ttl, now));
        Ok(())
    }

    async fn insert_if_not_exists(
        &self,
        table: &str,
        partition: &str,
        clustering: &str,
        value: Vec<u8>,
        ttl: Option<i64>,
    ) -> StorageResult<Option<Vec<u8>>> {
        let now = self.begin_write()?;
        let mut rows = self.partitions.entry(Self::key(table, partition)).or_default();
        if let Some(existing) = rows.get(clustering).filter(|c| c.is_live(now)) {
            return Ok(Some(existing.value.clone()));
        }
        rows.insert(clustering.to_owned(), Cell::new(value, ttl, now));
        Ok(None)
    }

    async fn select(
        &self,
        table: &str,
        partition: &str,
        clustering: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        let now = self.begin_read()?;
        Ok(self
            .partitions
            .get(&Self::key(table, partition))
            .and_then(|rows| {
                rows.get(clustering)
                    .filter(|c| c.is_live(now))
                    .map(|c| c.value.clone())
            }))
    }

    async fn select_partition(&self, table: &str, partition: &str) -> StorageResult<Vec<Row>> {
        let now = self.begin_read()?;
        Ok(self
            .partitions
            .get(&Self::key(table, partition))
            .map(|rows| {
                rows.iter()
                    .filter(|(_, c)| c.is_live(now))
                    .map(|(clustering, c)| Row {
                        clustering: clustering.clone(),
                        value: c.value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, table: &str, partition: &str, clustering: &str) -> StorageResult<bool> {
        let now = self.begin_write()?;
        Ok(self
            .partitions
            .get_mut(&Self::key(table, partition))
            .and_then(|mut rows| rows.remove(clustering))
            .is_some_and(|c| c.is_live(now)))
    }

    async fn delete_partition(&self, table: &str, partition: &str) -> StorageResult<()> {
        self.begin_write()?;
        self.partitions.remove(&Self::key(table, partition));
        Ok(())
    }

    async fn shutdown(&self) -> StorageResult<()> {
        self.partitions.clear();
        Ok(())
    }
}
