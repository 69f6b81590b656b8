//! API client for the filevault server.
//!
//! Every call goes through the same pipeline: build the request, run the
//! authorizer's request stage, dispatch, then run the matching response
//! stage before the result reaches the caller.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::models::UploadFile;

use super::{ApiError, RequestAuthorizer};

// ============================================================================
// Constants
// ============================================================================

/// Default server address for a local deployment
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/";

/// HTTP request timeout in seconds.
/// Uploads go through the same client, so this stays generous.
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const LOGIN_PATH: &str = "/api/login";
pub const REGISTER_PATH: &str = "/api/register";

/// API client for filevault.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    authorizer: RequestAuthorizer,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: &str, authorizer: RequestAuthorizer) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            authorizer,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", path, e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.request(method, self.url(path)?))
    }

    /// Run a request through the authorization pipeline.
    ///
    /// A rejection from the request stage is returned as-is; it has already
    /// done its own cleanup and never reaches the response stage.
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build()?;
        let request = self.authorizer.on_request(request)?;
        let url = request.url().clone();

        debug!(method = %request.method(), url = %url, "Sending request");
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => return Err(self.authorizer.on_response_error(&url, e.into())),
        };

        match Self::check_response(response).await {
            Ok(response) => Ok(self.authorizer.on_response(response)),
            Err(e) => Err(self.authorizer.on_response_error(&url, e)),
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Execute and parse the body as JSON. An empty body parses as `null`.
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        let url = response.url().clone();
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };

        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.request(Method::GET, path)?).await
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(self.request(Method::POST, path)?.json(body)).await
    }

    // ===== Folders =====

    pub async fn get_root_folder(&self) -> Result<Value, ApiError> {
        self.get_json("/api/folder/root").await
    }

    /// Fetch a folder, optionally through a share access code
    pub async fn get_folder(&self, id: i64, code: Option<&str>) -> Result<Value, ApiError> {
        let mut builder = self.request(Method::GET, &format!("/api/folder/{}", id))?;
        if let Some(code) = code.filter(|c| !c.is_empty()) {
            builder = builder.query(&[("code", code)]);
        }
        self.send_json(builder).await
    }

    pub async fn create_folder(&self, name: &str, parent_id: Option<i64>) -> Result<Value, ApiError> {
        let body = json!({ "name": name, "parent_id": parent_id });
        self.post_json("/api/folder", &body).await
    }

    pub async fn rename_folder(&self, name: &str, id: i64) -> Result<Value, ApiError> {
        let builder = self
            .request(Method::PUT, &format!("/api/folder/{}", id))?
            .json(&json!({ "name": name }));
        self.send_json(builder).await
    }

    pub async fn delete_folder(&self, id: i64) -> Result<Value, ApiError> {
        self.send_json(self.request(Method::DELETE, &format!("/api/folder/{}", id))?)
            .await
    }

    /// Start sharing a folder; the response carries the access code
    pub async fn share_folder_by_code(&self, folder_id: i64) -> Result<Value, ApiError> {
        self.send_json(self.request(Method::POST, &format!("/api/folder/share/{}", folder_id))?)
            .await
    }

    pub async fn stop_share_folder(&self, folder_id: i64) -> Result<Value, ApiError> {
        let path = format!("/api/folder/stop/sharing/{}", folder_id);
        self.send_json(self.request(Method::POST, &path)?).await
    }

    // ===== Files =====

    pub async fn upload_files(&self, folder_id: i64, files: Vec<UploadFile>) -> Result<Value, ApiError> {
        let form = files.into_iter().fold(Form::new(), |form, file| {
            form.part("files", Part::bytes(file.contents).file_name(file.file_name))
        });
        let builder = self
            .request(Method::POST, &format!("/api/files/upload/{}", folder_id))?
            .multipart(form);
        self.send_json(builder).await
    }

    pub async fn delete_files(&self, file_ids: &[i64]) -> Result<Value, ApiError> {
        let builder = self
            .request(Method::DELETE, "/api/files/delete")?
            .json(&json!({ "file_ids": file_ids }));
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockito::{Matcher, Server};

    use super::*;
    use crate::auth::session::{ACCESS_CODE_KEY, TOKEN_KEY, USER_KEY};
    use crate::navigation::{RecordingNavigator, Route};
    use crate::storage::{KeyValueStore, MemoryStore};

    fn client(base_url: &str) -> (ApiClient, Arc<MemoryStore>, Arc<RecordingNavigator>) {
        let storage = Arc::new(MemoryStore::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let authorizer = RequestAuthorizer::new(storage.clone(), navigator.clone());
        let client = ApiClient::new(base_url, authorizer).unwrap();
        (client, storage, navigator)
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let (client, _, _) = client("http://localhost:9000/v1");
        assert_eq!(client.base_url().as_str(), "http://localhost:9000/v1/");
        assert_eq!(
            client.url("/api/folder/root").unwrap().as_str(),
            "http://localhost:9000/v1/api/folder/root"
        );
    }

    #[tokio::test]
    async fn test_protected_call_carries_bearer_token() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/folder/root")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":1,"name":"root"}"#)
            .create_async()
            .await;

        let (client, storage, _) = client(&server.url());
        storage.set(TOKEN_KEY, "abc").unwrap();

        let folder = client.get_root_folder().await.unwrap();

        m.assert_async().await;
        assert_eq!(folder["name"], "root");
    }

    #[tokio::test]
    async fn test_no_token_means_no_request() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/folder/root")
            .expect(0)
            .create_async()
            .await;

        let (client, _, navigator) = client(&server.url());
        let err = client.get_root_folder().await.unwrap_err();

        m.assert_async().await;
        assert!(matches!(err, ApiError::NoCredential));
        assert_eq!(navigator.routes(), vec![Route::LoginReg]);
    }

    #[tokio::test]
    async fn test_forbidden_response_clears_session() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/api/folder/3")
            .with_status(403)
            .with_body(r#"{"message":"forbidden"}"#)
            .create_async()
            .await;

        let (client, storage, navigator) = client(&server.url());
        storage.set(TOKEN_KEY, "abc").unwrap();
        storage.set(USER_KEY, r#"{"id":1}"#).unwrap();
        storage.set(ACCESS_CODE_KEY, "CODE").unwrap();

        let err = client.delete_folder(3).await.unwrap_err();

        assert!(matches!(err, ApiError::AccessDenied { .. }));
        assert!(storage.is_empty());
        assert_eq!(navigator.routes(), vec![Route::LoginReg]);
    }

    #[tokio::test]
    async fn test_server_error_passes_through() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/folder/9")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let (client, storage, navigator) = client(&server.url());
        storage.set(TOKEN_KEY, "abc").unwrap();

        let err = client.get_folder(9, None).await.unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        assert!(navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_get_folder_sends_access_code() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/api/folder/42")
            .match_query(Matcher::UrlEncoded("code".into(), "SHARE-1".into()))
            .with_status(200)
            .with_body(r#"{"id":42}"#)
            .create_async()
            .await;

        let (client, storage, _) = client(&server.url());
        storage.set(TOKEN_KEY, "abc").unwrap();

        let folder = client.get_folder(42, Some("SHARE-1")).await.unwrap();

        m.assert_async().await;
        assert_eq!(folder["id"], 42);
    }

    #[tokio::test]
    async fn test_delete_files_sends_ids_and_accepts_empty_body() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("DELETE", "/api/files/delete")
            .match_body(Matcher::Json(json!({ "file_ids": [1, 2, 3] })))
            .with_status(204)
            .create_async()
            .await;

        let (client, storage, _) = client(&server.url());
        storage.set(TOKEN_KEY, "abc").unwrap();

        let result = client.delete_files(&[1, 2, 3]).await.unwrap();

        m.assert_async().await;
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_create_folder_body() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/api/folder")
            .match_body(Matcher::Json(json!({ "name": "Photos", "parent_id": 1 })))
            .with_status(201)
            .with_body(r#"{"id":2,"name":"Photos"}"#)
            .create_async()
            .await;

        let (client, storage, _) = client(&server.url());
        storage.set(TOKEN_KEY, "abc").unwrap();

        let folder = client.create_folder("Photos", Some(1)).await.unwrap();

        m.assert_async().await;
        assert_eq!(folder["id"], 2);
    }
}
