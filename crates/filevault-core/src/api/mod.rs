//! REST API client module for the filevault server.
//!
//! This module provides the `ApiClient` for talking to the server and the
//! `RequestAuthorizer` that sits in front of every call it makes.
//!
//! The API uses JWT bearer token authentication. Tokens are issued by
//! `/api/login` and `/api/register` and read from persistent storage on
//! each request.

pub mod authorizer;
pub mod client;
pub mod error;

pub use authorizer::RequestAuthorizer;
pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ApiError;
