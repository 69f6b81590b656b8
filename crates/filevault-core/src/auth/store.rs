use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::api::client::{LOGIN_PATH, REGISTER_PATH};
use crate::api::{ApiClient, RequestAuthorizer};
use crate::models::AuthResponse;
use crate::navigation::{Navigator, Route};
use crate::storage::KeyValueStore;

use super::session::{Session, User, ACCESS_CODE_KEY, TOKEN_KEY, USER_KEY};
use super::AuthError;

/// Shown when login fails without any better explanation
pub const LOGIN_FALLBACK_MESSAGE: &str = "Invalid e-mail or password";

/// Shown when registration fails without any better explanation
pub const REGISTER_FALLBACK_MESSAGE: &str = "Registration failed";

/// Owner of the session.
///
/// Every mutation updates the in-memory `Session` and the persistent storage
/// together, without awaiting in between. The same storage backs the
/// `RequestAuthorizer` inside the API client.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    api: ApiClient,
    session: Session,
}

impl SessionStore {
    /// Build a store and its API client around shared storage and navigation
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        base_url: &str,
    ) -> Result<Self> {
        let authorizer = RequestAuthorizer::new(storage.clone(), navigator.clone());
        let api = ApiClient::new(base_url, authorizer)?;
        Ok(Self {
            storage,
            navigator,
            api,
            session: Session::default(),
        })
    }

    /// Reload the session from persistent storage.
    ///
    /// An unreadable stored user is treated as signed out. A storage read
    /// failure leaves that field absent in memory without touching storage.
    pub fn hydrate(&mut self) {
        self.session.token = self.read(TOKEN_KEY);
        self.session.access_code = self.read(ACCESS_CODE_KEY);
        self.session.user = self.read(USER_KEY).and_then(|raw| {
            serde_json::from_str::<Option<User>>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Stored user is not valid JSON, ignoring it");
                None
            })
        });

        debug!(
            authenticated = self.is_authenticated(),
            has_access_code = self.session.access_code.is_some(),
            "Session loaded from storage"
        );
    }

    /// Alias for [`SessionStore::hydrate`]
    pub fn get_data_from_storage(&mut self) {
        self.hydrate();
    }

    pub async fn login<C: Serialize + ?Sized>(&mut self, credentials: &C) -> Result<(), AuthError> {
        self.authenticate(LOGIN_PATH, credentials, LOGIN_FALLBACK_MESSAGE)
            .await
    }

    pub async fn register<P: Serialize + ?Sized>(&mut self, payload: &P) -> Result<(), AuthError> {
        self.authenticate(REGISTER_PATH, payload, REGISTER_FALLBACK_MESSAGE)
            .await
    }

    async fn authenticate<B: Serialize + ?Sized>(
        &mut self,
        path: &str,
        payload: &B,
        fallback: &str,
    ) -> Result<(), AuthError> {
        let response: AuthResponse = match self.api.post_json(path, payload).await {
            Ok(response) => response,
            Err(e) => {
                error!(path = path, error = %e, "Authentication request failed");
                return Err(AuthError::from_api(&e, fallback));
            }
        };

        let (token, user) = match (response.jwt_token, response.user) {
            (Some(token), Some(user)) if !token.is_empty() => (token, user),
            _ => {
                error!(path = path, "Authentication response is missing token or user");
                return Err(AuthError::RequestFailed(fallback.to_string()));
            }
        };

        self.set_session(token, user);
        self.navigator.navigate(Route::Home);
        info!(path = path, user_id = ?self.user().and_then(User::id), "Signed in");
        Ok(())
    }

    /// Install a new session. Any access code is dropped.
    pub fn set_session(&mut self, token: String, user: User) {
        self.session.access_code = None;
        self.persist(ACCESS_CODE_KEY, None);

        match serde_json::to_string(&user) {
            Ok(raw) => self.persist(USER_KEY, Some(&raw)),
            Err(e) => warn!(error = %e, "Failed to serialize user"),
        }
        self.persist(TOKEN_KEY, Some(&token));

        self.session.token = Some(token);
        self.session.user = Some(user);
    }

    /// Drop token, user and access code. Safe to call repeatedly.
    pub fn clear_session(&mut self) {
        self.session = Session::default();
        for key in [TOKEN_KEY, USER_KEY, ACCESS_CODE_KEY] {
            self.persist(key, None);
        }
    }

    /// Clear the session and send the user back to the login surface
    pub fn logout(&mut self) {
        self.clear_session();
        self.navigator.navigate(Route::LoginReg);
        info!("Signed out");
    }

    /// Store an access code. `None` or an empty code clears it.
    pub fn set_access_code(&mut self, code: Option<&str>) {
        match code.filter(|c| !c.is_empty()) {
            Some(code) => {
                self.persist(ACCESS_CODE_KEY, Some(code));
                self.session.access_code = Some(code.to_string());
            }
            None => self.clear_access_code(),
        }
    }

    pub fn clear_access_code(&mut self) {
        self.session.access_code = None;
        self.persist(ACCESS_CODE_KEY, None);
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    pub fn access_code(&self) -> Option<&str> {
        self.session.access_code.as_deref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The configured API client, for protected calls
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn read(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap_or_else(|e| {
            warn!(key = key, error = %e, "Failed to read session value");
            None
        })
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            warn!(key = key, error = %e, "Failed to persist session value");
        }
    }
}
