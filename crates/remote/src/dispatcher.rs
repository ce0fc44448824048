//! Routes rule payloads to the matching remote operation.
//!
//! Actions become "create action" calls and property updates become
//! "update property" calls against the given target entity. A raw value that
//! is neither shape is rejected before any remote call is made.

use std::sync::Arc;

use reactor_core::{Payload, PayloadError};
use serde_json::Value;

use crate::traits::{EntityApi, RemoteError};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Classification(#[from] PayloadError),

    #[error("Remote operation failed: {0}")]
    Remote(#[from] RemoteError),
}

/// Sends payloads through a shared [`EntityApi`].
#[derive(Clone)]
pub struct OutputDispatcher {
    api: Arc<dyn EntityApi>,
}

impl OutputDispatcher {
    pub fn new(api: Arc<dyn EntityApi>) -> Self {
        Self { api }
    }

    pub fn api_name(&self) -> &str {
        self.api.api_name()
    }

    /// Dispatch an already-classified payload against `target`.
    ///
    /// The caller is responsible for `target` being a resolved entity id.
    pub async fn dispatch(&self, target: &str, payload: &Payload) -> Result<Value, DispatchError> {
        let start = std::time::Instant::now();
        let result = match payload {
            Payload::Action(action) => self.api.create_action(target, action).await,
            Payload::Property(property) => self.api.update_property(target, property).await,
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::debug!(
                thng = target,
                kind = payload.kind(),
                api = self.api.api_name(),
                duration_ms,
                "payload dispatched"
            ),
            Err(e) => tracing::warn!(
                thng = target,
                kind = payload.kind(),
                api = self.api.api_name(),
                error = %e,
                duration_ms,
                "payload dispatch failed"
            ),
        }

        Ok(result?)
    }

    /// Classify a raw JSON payload, then dispatch it.
    pub async fn dispatch_value(&self, target: &str, raw: &Value) -> Result<Value, DispatchError> {
        let payload = Payload::classify(raw)?;
        self.dispatch(target, &payload).await
    }
}

impl std::fmt::Debug for OutputDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputDispatcher")
            .field("api", &self.api.api_name())
            .finish()
    }
}
