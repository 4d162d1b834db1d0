use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;

use super::KeyValueStore;
use crate::error::{StorageError, StorageResult};

type Entries = BTreeMap<String, String>;

/// Persistent store backed by one JSON object file.
///
/// The file is read once on open. Each mutation rewrites it through a
/// temporary sibling and a rename, so a crash leaves either the old or the
/// new contents. The in-memory copy only changes once the write succeeded.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: Mutex<Entries>,
}

impl FileStore {
    /// Opens `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Entries::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                StorageError::Backend(format!("corrupted store file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Entries::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), entries = data.len(), "opened file store");
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<R>(
        &self,
        f: impl FnOnce(&mut Entries) -> R,
    ) -> StorageResult<R> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        let out = f(&mut next);
        write_atomic(&self.path, &next)?;
        *data = next;
        Ok(out)
    }
}

fn write_atomic(
    path: &Path,
    entries: &Entries,
) -> StorageResult<()> {
    let raw = serde_json::to_vec_pretty(entries).map_err(|e| StorageError::Serialize {
        key: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, raw)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(
        &self,
        key: &str,
    ) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(
        &self,
        key: &str,
        value: String,
    ) -> StorageResult<()> {
        self.update(|data| {
            data.insert(key.to_owned(), value);
        })
    }

    fn remove(
        &self,
        key: &str,
    ) -> StorageResult<bool> {
        if !self.data.lock().contains_key(key) {
            return Ok(false);
        }
        self.update(|data| data.remove(key).is_some())
    }

    fn clear(&self) -> StorageResult<()> {
        self.update(|data| data.clear())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.data.lock().len())
    }
}
