use std::{fmt, path::Path, sync::Arc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{FileStore, InMemoryStore, KeyValueStore};
use crate::error::{log_by_status, StorageError, StorageResult};

/// File used by [`StorageKind::Local`] when no path is configured.
pub const DEFAULT_LOCAL_PATH: &str = "widgetbus-storage.json";

/// Lifetime of stored items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Persisted to a file, survives restarts.
    Local,
    /// Kept in memory for the life of the process.
    #[default]
    Session,
}

impl fmt::Display for StorageKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Session => f.write_str("session"),
        }
    }
}

/// Typed JSON access on top of a [`KeyValueStore`].
///
/// Item operations never fail to the caller: parse, serialization and
/// backend errors are logged and turn into `None` or a no-op.
#[derive(Clone)]
pub struct StorageManager {
    store: Arc<dyn KeyValueStore>,
}

impl StorageManager {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }

    /// Opens a store of the given kind. `path` only matters for
    /// [`StorageKind::Local`] and defaults to [`DEFAULT_LOCAL_PATH`].
    pub fn open(
        kind: StorageKind,
        path: Option<&Path>,
    ) -> StorageResult<Self> {
        let manager = match kind {
            StorageKind::Session => Self::in_memory(),
            StorageKind::Local => {
                let path = path.unwrap_or_else(|| Path::new(DEFAULT_LOCAL_PATH));
                Self::new(FileStore::open(path)?)
            }
        };
        tracing::debug!(%kind, "opened storage");
        Ok(manager)
    }

    /// Reads and parses the item under `key`.
    pub fn get_item<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                log_by_status!(e, key, "failed to read item from storage");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                let err = StorageError::Deserialize {
                    key: key.to_owned(),
                    reason: e.to_string(),
                };
                log_by_status!(err, key, "failed to parse item from storage");
                None
            }
        }
    }

    /// Serializes `value` and stores it under `key`.
    pub fn set_item<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                let err = StorageError::Serialize {
                    key: key.to_owned(),
                    reason: e.to_string(),
                };
                log_by_status!(err, key, "failed to serialize item for storage");
                return;
            }
        };
        if let Err(e) = self.store.set(key, raw) {
            log_by_status!(e, key, "failed to write item to storage");
        }
    }

    pub fn remove_item(
        &self,
        key: &str,
    ) {
        if let Err(e) = self.store.remove(key) {
            log_by_status!(e, key, "failed to remove item from storage");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            log_by_status!(e, "failed to clear storage");
        }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }
}

impl fmt::Debug for StorageManager {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("StorageManager")
            .field("items", &self.store.len().ok())
            .finish()
    }
}
