//! Request payloads and small value types shared by the client and front ends.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::User;

/// Login form payload for `/api/login`
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration form payload for `/api/register`
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Success body of the login and registration endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub jwt_token: Option<String>,
    pub user: Option<User>,
}

/// One file part of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl UploadFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", path.display()))?;
        Ok(Self { file_name, contents })
    }
}
