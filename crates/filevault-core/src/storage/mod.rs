//! Persistent key-value storage for session state.
//!
//! This module provides the `KeyValueStore` port that the session store and
//! the request authorizer share, plus three backends:
//! - `FileStore`: JSON map on disk, rewritten on every mutation
//! - `KeyringStore`: one OS keychain entry per key
//! - `MemoryStore`: process-local, nothing survives a restart
//!
//! Values are plain strings. Writers replace whole keys; there are no
//! partial updates and no version checks.

pub mod file;
pub mod keychain;
pub mod memory;

use anyhow::Result;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// `Ok(None)` means the key is absent. An `Err` means the backend could
    /// not answer, which callers must not mistake for absence.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
