use std::sync::Arc;

use dashmap::DashMap;

use super::KeyValueStore;
use crate::error::StorageResult;

/// Session-scoped store. Contents live as long as the last clone.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    pub data: Arc<DashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(
        &self,
        key: &str,
    ) -> StorageResult<Option<String>> {
        Ok(self.data.get(key).map(|entry| entry.clone()))
    }

    fn set(
        &self,
        key: &str,
        value: String,
    ) -> StorageResult<()> {
        self.data.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(
        &self,
        key: &str,
    ) -> StorageResult<bool> {
        Ok(self.data.remove(key).is_some())
    }

    fn clear(&self) -> StorageResult<()> {
        self.data.clear();
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Basic test to verify that a value can be set and then retrieved.
    #[test]
    fn test_set_and_get() {
        let store = InMemoryStore::new();
        store.set("hello", "world".into()).unwrap();
        assert_eq!(store.get("hello").unwrap().as_deref(), Some("world"));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    /// Ensures that setting a value twice for the same key overwrites the old one.
    #[test]
    fn test_overwrite_value() {
        let store = InMemoryStore::new();
        store.set("k", "one".into()).unwrap();
        store.set("k", "two".into()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = InMemoryStore::new();
        store.set("a", "1".into()).unwrap();
        store.set("b", "2".into()).unwrap();

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        assert_eq!(store.len().unwrap(), 1);

        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }

    /// Clones share the same data.
    #[test]
    fn test_clones_share_data() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.set("shared", "yes".into()).unwrap();
        assert_eq!(other.get("shared").unwrap().as_deref(), Some("yes"));
    }
}
