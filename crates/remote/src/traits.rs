//! Entity API trait definition and shared error types.

use reactor_core::{ActionPayload, PropertyPayload};
use serde_json::Value;

/// Errors raised by a remote entity API call.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} returned {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("{0}")]
    Other(String),
}

/// The two operations rules need from the entity-management service.
///
/// Calls are not deduplicated and never retried here; a failure surfaces
/// to the caller as-is.
#[async_trait::async_trait]
pub trait EntityApi: Send + Sync {
    /// Create an action of `action.action_type` attached to `entity_id`.
    async fn create_action(
        &self,
        entity_id: &str,
        action: &ActionPayload,
    ) -> Result<Value, RemoteError>;

    /// Update a single property on `entity_id`.
    async fn update_property(
        &self,
        entity_id: &str,
        property: &PropertyPayload,
    ) -> Result<Value, RemoteError>;

    /// Human-readable name for this API backend (e.g. "http", "dry-run").
    fn api_name(&self) -> &str;
}
