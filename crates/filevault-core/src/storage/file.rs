use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::KeyValueStore;

/// Storage file name in the data directory
pub const STORAGE_FILE: &str = "storage.json";

/// Key-value store backed by a single JSON file.
///
/// The whole map is loaded on open and the whole file is rewritten on each
/// mutation, so readers in this process always see the last write.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, creating nothing until the first write.
    ///
    /// An unparseable file is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read storage file: {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Storage file is corrupt, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = entries.len(), "Storage opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Open `storage.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Result<Self> {
        Self::open(dir.join(STORAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write storage file: {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();

        let store = FileStore::in_dir(dir.path()).unwrap();
        store.set("jwt_token", "abc").unwrap();
        store.set("access_code", "XYZ").unwrap();
        store.remove("access_code").unwrap();
        drop(store);

        let reopened = FileStore::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.get("jwt_token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("access_code").unwrap(), None);
    }

    #[test]
    fn test_missing_file_is_empty_and_not_created() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::in_dir(&dir.path().join("nested")).unwrap();

        assert_eq!(store.get("jwt_token").unwrap(), None);
        store.remove("jwt_token").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(STORAGE_FILE);
        std::fs::write(&path, "{ definitely not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("jwt_token").unwrap(), None);

        store.set("jwt_token", "fresh").unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("jwt_token").unwrap().as_deref(), Some("fresh"));
    }
}
