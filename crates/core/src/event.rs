//! Inbound event shapes delivered by the host runtime.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of an addressable entity (a "thng").
pub type EntityId = String;

/// An action record as it arrives in an `actionCreated` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    /// The acting entity, when the action is attached to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thng: Option<EntityId>,
    /// Every other field of the action, kept verbatim.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Action {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            thng: None,
            fields: Map::new(),
        }
    }

    pub fn on_thng(mut self, thng: impl Into<EntityId>) -> Self {
        self.thng = Some(thng.into());
        self
    }

    /// The entity this action targets. An empty id counts as absent.
    pub fn target(&self) -> Option<&str> {
        self.thng.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThngRef {
    pub id: EntityId,
}

/// One entry of a property-change batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    #[serde(rename = "newValue", default)]
    pub new_value: Value,
    #[serde(rename = "oldValue", default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
}

impl PropertyChange {
    pub fn new(new_value: impl Into<Value>) -> Self {
        Self {
            new_value: new_value.into(),
            old_value: None,
        }
    }
}

/// A `thngPropertiesChanged` event. `changes` keeps the order the host sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChangeEvent {
    pub thng: ThngRef,
    pub changes: IndexMap<String, PropertyChange>,
}

/// Envelope used by the worker to carry either event kind on one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    ActionCreated(ActionEvent),
    ThngPropertiesChanged(PropertyChangeEvent),
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::ActionCreated(_) => "actionCreated",
            HostEvent::ThngPropertiesChanged(_) => "thngPropertiesChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_keeps_extra_fields() {
        let event: ActionEvent = serde_json::from_value(json!({
            "action": { "type": "scans", "thng": "T1", "location": { "lat": 1.0 } }
        }))
        .unwrap();
        assert_eq!(event.action.action_type, "scans");
        assert_eq!(event.action.target(), Some("T1"));
        assert_eq!(event.action.fields["location"]["lat"], json!(1.0));
    }

    #[test]
    fn empty_thng_is_no_target() {
        let action = Action::new("scans").on_thng("");
        assert_eq!(action.target(), None);
    }

    #[test]
    fn changes_preserve_wire_order() {
        let event: PropertyChangeEvent = serde_json::from_str(
            r#"{"thng":{"id":"T9"},"changes":{"zeta":{"newValue":1},"alpha":{"newValue":2,"oldValue":1}}}"#,
        )
        .unwrap();
        let keys: Vec<&str> = event.changes.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(event.changes["alpha"].old_value, Some(json!(1)));
    }

    #[test]
    fn host_event_envelope() {
        let event: HostEvent = serde_json::from_value(json!({
            "event": "thngPropertiesChanged",
            "thng": { "id": "T1" },
            "changes": { "humidity": { "newValue": 80 } }
        }))
        .unwrap();
        assert_eq!(event.name(), "thngPropertiesChanged");
        match event {
            HostEvent::ThngPropertiesChanged(e) => assert_eq!(e.thng.id, "T1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
