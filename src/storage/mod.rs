//! Key/value persistence for widget state.
//!
//! - `store`: the `KeyValueStore` backend trait.
//! - `memory`: session-scoped in-memory backend.
//! - `file`: local backend persisted to a JSON file.
//! - `manager`: `StorageManager`, typed JSON items over any backend.

pub mod file;
pub mod manager;
pub mod memory;
pub mod store;

pub use file::FileStore;
pub use manager::{StorageKind, StorageManager, DEFAULT_LOCAL_PATH};
pub use memory::InMemoryStore;
pub use store::KeyValueStore;
