//! Output payloads produced by rules.
//!
//! A payload is either an action to create or a property update. The two
//! shapes are told apart structurally: a non-empty `type` makes an action,
//! otherwise a non-empty `key` with a `value` present makes a property update.
//! An explicit `null` is a value; only a missing `value` is rejected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// Body of an action to create on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(rename = "thngId", default, skip_serializing_if = "Option::is_none")]
    pub thng_id: Option<String>,
    #[serde(rename = "customFields", default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A key/value assertion against an entity's properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPayload {
    pub key: String,
    pub value: Value,
}

impl PropertyPayload {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Action(ActionPayload),
    Property(PropertyPayload),
}

impl Payload {
    /// Classify a raw JSON value. The action check runs first.
    pub fn classify(value: &Value) -> Result<Payload, PayloadError> {
        let unclassifiable = || PayloadError::Unclassifiable(value.to_string());
        let obj = value.as_object().ok_or_else(unclassifiable)?;

        if is_non_empty_str(obj.get("type")) {
            let action: ActionPayload = serde_json::from_value(value.clone())
                .map_err(|e| PayloadError::Unclassifiable(format!("{value}: {e}")))?;
            return Ok(Payload::Action(action));
        }

        if is_non_empty_str(obj.get("key")) && obj.contains_key("value") {
            let property: PropertyPayload = serde_json::from_value(value.clone())
                .map_err(|e| PayloadError::Unclassifiable(format!("{value}: {e}")))?;
            return Ok(Payload::Property(property));
        }

        Err(unclassifiable())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Action(_) => "action",
            Payload::Property(_) => "property",
        }
    }

    pub fn to_value(&self) -> Result<Value, PayloadError> {
        serde_json::to_value(self).map_err(|e| PayloadError::Serialize(e.to_string()))
    }
}

fn is_non_empty_str(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).is_some_and(|s| !s.is_empty())
}
