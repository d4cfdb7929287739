//! Typed access to primary tables.

use std::sync::Arc;

use kc_storage::StorageResult;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::boundary::ColumnStore;
use crate::codec::{decode, encode};

/// A primary table holding serialized entities.
#[derive(Debug, Clone, Copy)]
pub struct Table {
    name: &'static str,
}

impl Table {
    /// Table with the given name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Reads one entity.
    pub async fn get<T: DeserializeOwned>(
        &self,
        store: &Arc<dyn ColumnStore>,
        partition: &str,
        clustering: &str,
    ) -> StorageResult<Option<T>> {
        store
            .select(self.name, partition, clustering)
            .await?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Reads every entity of a partition in clustering order.
    pub async fn all<T: DeserializeOwned>(
        &self,
        store: &Arc<dyn ColumnStore>,
        partition: &str,
    ) -> StorageResult<Vec<T>> {
        store
            .select_partition(self.name, partition)
            .await?
            .iter()
            .map(|row| decode(&row.value))
            .collect()
    }

    /// Writes one entity.
    pub async fn put<T: Serialize + Sync>(
        &self,
        store: &Arc<dyn ColumnStore>,
        partition: &str,
        clustering: &str,
        value: &T,
        ttl: Option<i64>,
    ) -> StorageResult<()> {
        store
            .insert(self.name, partition, clustering, encode(value)?, ttl)
            .await
    }

    /// Deletes one entity. Returns whether it existed.
    pub async fn remove(
        &self,
        store: &Arc<dyn ColumnStore>,
        partition: &str,
        clustering: &str,
    ) -> StorageResult<bool> {
        store.delete(self.name, partition, clustering).await
    }

    /// Deletes a whole partition.
    pub async fn remove_partition(
        &self,
        store: &Arc<dyn ColumnStore>,
        partition: &str,
    ) -> StorageResult<()> {
        store.delete_partition(self.name, partition).await
    }
}

/// Applies offset/limit pagination.
#[must_use]
pub fn paginate<T>(items: Vec<T>, first: Option<usize>, max: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(first.unwrap_or(0))
        .take(max.unwrap_or(usize::MAX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_bounds() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(paginate(items.clone(), Some(8), Some(5)), vec![8, 9]);
        assert_eq!(paginate(items.clone(), None, Some(2)), vec![0, 1]);
        assert_eq!(paginate(items, Some(20), None), Vec::<u32>::new());
    }
}
