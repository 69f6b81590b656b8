//! Request and response stages of the transport pipeline.
//!
//! `RequestAuthorizer` attaches the stored bearer token to outbound requests
//! and tears the session down when the server (or the missing token) says the
//! credential is no longer usable.

use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response, Url};
use tracing::{debug, warn};

use crate::auth::session::{ACCESS_CODE_KEY, TOKEN_KEY, USER_KEY};
use crate::navigation::{Navigator, Route};
use crate::storage::KeyValueStore;

use super::ApiError;

/// Endpoints that never carry a bearer token
pub const UNAUTHENTICATED_ENDPOINTS: &[&str] = &["/api/login", "/api/register"];

#[derive(Clone)]
pub struct RequestAuthorizer {
    storage: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
}

impl RequestAuthorizer {
    pub fn new(storage: Arc<dyn KeyValueStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { storage, navigator }
    }

    /// Whether `url` points at the login or registration endpoint
    pub fn is_unauthenticated_endpoint(url: &Url) -> bool {
        let path = url.path().trim_end_matches('/');
        UNAUTHENTICATED_ENDPOINTS
            .iter()
            .any(|endpoint| path.ends_with(endpoint))
    }

    /// Request stage: runs before dispatch.
    ///
    /// Protected requests without a token are rejected here and never sent.
    pub fn on_request(&self, mut request: Request) -> Result<Request, ApiError> {
        if Self::is_unauthenticated_endpoint(request.url()) {
            debug!(url = %request.url(), "Unauthenticated endpoint, no credential attached");
            return Ok(request);
        }

        // An unreadable store is not a missing token; the session stays put
        let token = self
            .storage
            .get(TOKEN_KEY)
            .map_err(|e| {
                warn!(error = %e, "Failed to read stored token");
                ApiError::StorageUnavailable(e.to_string())
            })?
            .filter(|t| !t.is_empty());
        let header = token.and_then(|token| {
            let value = HeaderValue::from_str(&format!("Bearer {}", token));
            if value.is_err() {
                warn!("Stored token is not a valid header value");
            }
            value.ok()
        });

        match header {
            Some(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
                Ok(request)
            }
            None => {
                warn!(url = %request.url(), "No authentication token, redirecting to login");
                self.invalidate();
                Err(ApiError::NoCredential)
            }
        }
    }

    /// Success stage: responses pass through untouched
    pub fn on_response(&self, response: Response) -> Response {
        response
    }

    /// Failure stage: runs before the error reaches the caller.
    ///
    /// Any 401 or 403 clears the stored session and redirects to login,
    /// whichever endpoint produced it.
    pub fn on_response_error(&self, url: &Url, error: ApiError) -> ApiError {
        if error.is_auth_invalid() {
            warn!(url = %url, error = %error, "Credential rejected, clearing session");
            self.invalidate();
        }
        error
    }

    fn invalidate(&self) {
        for key in [TOKEN_KEY, USER_KEY, ACCESS_CODE_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key = key, error = %e, "Failed to clear stored session value");
            }
        }
        self.navigator.navigate(Route::LoginReg);
    }
}
