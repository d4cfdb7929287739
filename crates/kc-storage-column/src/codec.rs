//! Row value encoding.

use kc_storage::{StorageError, StorageResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encodes an entity as a row value.
pub fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decodes a row value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_value_is_serialization_error() {
        let err = decode::<kc_model::LoginFailure>(b"{not json").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
