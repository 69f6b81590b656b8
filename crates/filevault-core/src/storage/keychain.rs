use anyhow::{Context, Result};
use keyring::Entry;
use tracing::warn;

use super::KeyValueStore;

const SERVICE_NAME: &str = "filevault";

/// Key-value store backed by the OS keychain, one entry per key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a custom keychain service name (one per profile)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

/// Only `NoEntry` means absent; a locked or unreachable keychain is an error.
fn read_entry(key: &str, result: keyring::Result<String>) -> Result<Option<String>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => {
            warn!(key = key, error = %e, "Failed to read from keychain");
            Err(e).context("Failed to read value from keychain")
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        read_entry(key, self.entry(key)?.get_password())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete value from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_missing_entry_reads_as_absent() {
        assert_eq!(read_entry("jwt_token", Ok("abc".into())).unwrap().as_deref(), Some("abc"));
        assert_eq!(read_entry("jwt_token", Err(keyring::Error::NoEntry)).unwrap(), None);

        let locked = read_entry(
            "jwt_token",
            Err(keyring::Error::NoStorageAccess("keychain is locked".into())),
        );
        assert!(locked.is_err());
    }
}
