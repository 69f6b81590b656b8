//! Core library for filevault.
//!
//! Client-side session handling for the filevault file-storage server:
//! persisted session state, bearer-token injection on every API call, and
//! automatic sign-out when the server rejects the credential.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;
pub mod storage;

pub use api::{ApiClient, ApiError, RequestAuthorizer};
pub use auth::{AuthError, Session, SessionStore, User};
pub use config::{Config, StorageBackend};
pub use navigation::{Navigator, PendingRoute, Route};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
