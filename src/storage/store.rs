use crate::error::StorageResult;

/// String key/value backend behind a [`StorageManager`](super::StorageManager).
///
/// Implementations use interior mutability so a store can be shared between
/// brokers.
pub trait KeyValueStore: Send + Sync {
    fn get(
        &self,
        key: &str,
    ) -> StorageResult<Option<String>>;

    fn set(
        &self,
        key: &str,
        value: String,
    ) -> StorageResult<()>;

    /// Returns `true` if the key existed.
    fn remove(
        &self,
        key: &str,
    ) -> StorageResult<bool>;

    fn clear(&self) -> StorageResult<()>;

    fn len(&self) -> StorageResult<usize>;

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
