use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Login or registration failed. The message is meant for the user.
    #[error("{0}")]
    RequestFailed(String),
}

impl AuthError {
    /// Build a user-facing failure from a transport error.
    ///
    /// Priority: server `message`, server `error`, the transport error's own
    /// message, then `fallback`. A bare 401/403 says nothing useful about
    /// the submitted credentials, so it goes straight to `fallback`.
    pub fn from_api(error: &ApiError, fallback: &str) -> Self {
        let message = error
            .server_message()
            .or_else(|| {
                Some(error.to_string())
                    .filter(|m| !m.trim().is_empty() && !error.is_auth_invalid())
            })
            .unwrap_or_else(|| fallback.to_string());
        AuthError::RequestFailed(message)
    }
}
