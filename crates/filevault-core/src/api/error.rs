use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Raised before dispatch when a protected request has no usable token
    #[error("No authentication token")]
    NoCredential,

    #[error("Unauthorized")]
    Unauthorized { body: String },

    #[error("Access denied: {}", truncate_body(.body))]
    AccessDenied { body: String },

    #[error("Resource not found: {}", truncate_body(.body))]
    NotFound { body: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited { body: String },

    #[error("Server error: {}", truncate_body(.body))]
    ServerError { status: StatusCode, body: String },

    #[error("Request rejected with status {status}: {}", truncate_body(.body))]
    Rejected { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Session storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = body.to_string();
        match status.as_u16() {
            401 => ApiError::Unauthorized { body },
            403 => ApiError::AccessDenied { body },
            404 => ApiError::NotFound { body },
            429 => ApiError::RateLimited { body },
            500..=599 => ApiError::ServerError { status, body },
            _ => ApiError::Rejected { status, body },
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied { .. } => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ApiError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::ServerError { status, .. } | ApiError::Rejected { status, .. } => {
                Some(*status)
            }
            ApiError::NetworkError(e) => e.status(),
            _ => None,
        }
    }

    /// The current credential is unusable: 401, 403, or no token at all
    pub fn is_auth_invalid(&self) -> bool {
        matches!(
            self,
            ApiError::NoCredential | ApiError::Unauthorized { .. } | ApiError::AccessDenied { .. }
        )
    }

    /// Raw response body, when the server sent one
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { body }
            | ApiError::AccessDenied { body }
            | ApiError::NotFound { body }
            | ApiError::RateLimited { body }
            | ApiError::ServerError { body, .. }
            | ApiError::Rejected { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Human-readable message supplied by the server.
    ///
    /// Looks at the JSON body's `message` field first, then `error`.
    pub fn server_message(&self) -> Option<String> {
        let body: Value = serde_json::from_str(self.body()?).ok()?;
        ["message", "error"].iter().find_map(|field| {
            body.get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, ""),
            ApiError::AccessDenied { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, ""),
            ApiError::Rejected { .. }
        ));
        assert_eq!(
            ApiError::from_status(StatusCode::CONFLICT, "").status(),
            Some(StatusCode::CONFLICT)
        );
    }

    #[test]
    fn test_auth_invalid_class() {
        assert!(ApiError::NoCredential.is_auth_invalid());
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_auth_invalid());
        assert!(ApiError::from_status(StatusCode::FORBIDDEN, "").is_auth_invalid());

        assert!(!ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "").is_auth_invalid());
        assert!(!ApiError::from_status(StatusCode::NOT_FOUND, "").is_auth_invalid());
        assert!(!ApiError::InvalidResponse("bad json".into()).is_auth_invalid());
    }

    #[test]
    fn test_server_message_priority() {
        let both = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message":"bad creds","error":"invalid_grant"}"#,
        );
        assert_eq!(both.server_message().as_deref(), Some("bad creds"));

        let error_only = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#);
        assert_eq!(error_only.server_message().as_deref(), Some("invalid_grant"));

        let blank_message = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message":"  ","error":"fallback"}"#,
        );
        assert_eq!(blank_message.server_message().as_deref(), Some("fallback"));

        let plain = ApiError::from_status(StatusCode::BAD_REQUEST, "<html>oops</html>");
        assert_eq!(plain.server_message(), None);
        assert_eq!(ApiError::NoCredential.server_message(), None);
    }

    #[test]
    fn test_long_bodies_are_truncated_in_display() {
        let body = "x".repeat(2000);
        let message = ApiError::from_status(StatusCode::FORBIDDEN, &body).to_string();
        assert!(message.contains("truncated, 2000 total bytes"));
        assert!(message.len() < 600);
    }
}
