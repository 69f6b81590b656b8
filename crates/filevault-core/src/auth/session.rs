use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "jwt_token";

/// Storage key for the JSON-serialized user identity
pub const USER_KEY: &str = "auth_user";

/// Storage key for the share access code
pub const ACCESS_CODE_KEY: &str = "access_code";

/// Identity record returned by the server. Opaque beyond a few accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(Value);

impl User {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Best label for display: name, then email, then id
    pub fn display_name(&self) -> String {
        ["name", "username", "email"]
            .iter()
            .find_map(|f| self.0.get(f).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| self.id().map(|id| format!("user #{}", id)))
            .unwrap_or_else(|| "unknown user".to_string())
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for User {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// In-memory session state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub access_code: Option<String>,
}

impl Session {
    /// Both a user and a non-empty token are present
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
