//! Transport seam between the console and the REST backend.

use crate::core::error::ApiError;
use async_trait::async_trait;
use serde_json::Value;

/// JSON-over-HTTP verbs against paths relative to the API base URL.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, ApiError>;
    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
    async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
    async fn delete(&self, path: &str) -> Result<(), ApiError>;
}
