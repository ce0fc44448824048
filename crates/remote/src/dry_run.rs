//! Entity API that only logs what it would have sent.

use reactor_core::{ActionPayload, PropertyPayload};
use serde_json::Value;

use crate::traits::{EntityApi, RemoteError};

#[derive(Debug, Default)]
pub struct DryRunApi;

#[async_trait::async_trait]
impl EntityApi for DryRunApi {
    async fn create_action(
        &self,
        entity_id: &str,
        action: &ActionPayload,
    ) -> Result<Value, RemoteError> {
        let body = serde_json::to_value(action).map_err(|e| RemoteError::Serialize(e.to_string()))?;
        tracing::info!(thng = entity_id, action_type = %action.action_type, %body, "dry-run: create action");
        Ok(body)
    }

    async fn update_property(
        &self,
        entity_id: &str,
        property: &PropertyPayload,
    ) -> Result<Value, RemoteError> {
        tracing::info!(thng = entity_id, key = %property.key, value = %property.value, "dry-run: update property");
        Ok(Value::Array(vec![serde_json::json!({
            "key": property.key,
            "value": property.value,
        })]))
    }

    fn api_name(&self) -> &str {
        "dry-run"
    }
}
