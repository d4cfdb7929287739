use kc_model::SingleUseObject;
use kc_storage::StorageResult;

use crate::CompositeRepository;
use crate::tags;

impl CompositeRepository {
    /// Stores a single-use object, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn put_single_use_object(
        &self,
        object: &SingleUseObject,
        ttl: i64,
    ) -> StorageResult<()> {
        self.cache
            .intercept_write(
                tags::PUT_SINGLE_USE_OBJECT,
                self.stores.single_use_objects.put(object, ttl),
            )
            .await
    }

    /// Stores a single-use object unless the key is taken. Returns whether
    /// it was stored.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn put_single_use_object_if_absent(
        &self,
        object: &SingleUseObject,
        ttl: i64,
    ) -> StorageResult<bool> {
        self.cache
            .intercept_write(
                tags::PUT_SINGLE_USE_OBJECT_IF_ABSENT,
                self.stores.single_use_objects.put_if_absent(object, ttl),
            )
            .await
    }

    /// Deletes a single-use object. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn delete_single_use_object(&self, key: &str) -> StorageResult<bool> {
        self.cache
            .intercept_write(
                tags::DELETE_SINGLE_USE_OBJECT,
                self.stores.single_use_objects.delete(key),
            )
            .await
    }

    /// Gets a single-use object.
    ///
    /// # Errors
    ///
    /// Store failure.
    pub async fn get_single_use_object(&self, key: &str) -> StorageResult<Option<SingleUseObject>> {
        self.cache
            .intercept_read(
                tags::GET_SINGLE_USE_OBJECT,
                key,
                self.stores.single_use_objects.get(key),
            )
            .await
    }
}
