//! Scoped, durable string storage.
//!
//! The client only ever sees [`PropertyStore`]; the substrate behind it
//! (memory, a JSON file, something else) is chosen by the caller.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::StoreResult;

/// String-keyed, string-valued property storage.
///
/// Deleting a missing key is not an error.
pub trait PropertyStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Deletes `key` only while it still holds `expected`, atomically with
    /// respect to the other operations. Returns whether it was deleted.
    fn delete_if(&self, key: &str, expected: &str) -> StoreResult<bool>;
}

#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    properties: Mutex<BTreeMap<String, String>>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryPropertyStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MemoryPropertyStore {
            properties: Mutex::new(
                iter.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn delete_if(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut properties = self.lock();
        if properties.get(key).map(String::as_str) == Some(expected) {
            properties.remove(key);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Properties kept as a single JSON object in one file.
///
/// Every write replaces the file through a temp file and a rename, so a
/// crash never leaves a half-written document behind. On unix the file is
/// readable by its owner only.
#[derive(Debug)]
pub struct FilePropertyStore {
    path: PathBuf,
    // serializes read-modify-write cycles within the process
    guard: Mutex<()>,
}

impl FilePropertyStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FilePropertyStore {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, properties: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(properties)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = properties.len(), "wrote properties");
        Ok(())
    }

    /// Runs `f` on the current properties and writes them back when it
    /// reports a change.
    fn update<F>(&self, f: F) -> StoreResult<bool>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let mut properties = self.read()?;
        let changed = f(&mut properties);
        if changed {
            self.write(&properties)?;
        }
        Ok(changed)
    }
}

impl PropertyStore for FilePropertyStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.update(|properties| {
            properties.insert(key.to_string(), value.to_string());
            true
        })?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.update(|properties| properties.remove(key).is_some())?;
        Ok(())
    }

    fn delete_if(&self, key: &str, expected: &str) -> StoreResult<bool> {
        self.update(|properties| {
            if properties.get(key).map(String::as_str) == Some(expected) {
                properties.remove(key);
                return true;
            }
            false
        })
    }
}
