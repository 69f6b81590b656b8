//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `Session`: in-memory user, bearer token and share access code
//! - `SessionStore`: the single owner of that state, kept in sync with
//!   persistent storage, plus login / registration against the server
//! - `AuthError`: user-facing login and registration failures
//!
//! Tokens do not expire on the client. A session ends on logout or when the
//! server rejects the token.

pub mod error;
pub mod session;
pub mod store;

pub use error::AuthError;
pub use session::{Session, User};
pub use store::SessionStore;
