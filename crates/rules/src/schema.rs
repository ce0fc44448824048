//! YAML schema for the rule table.
//!
//! A table holds two ordered rule lists:
//! - `action_rules`: fire on `actionCreated` events, keyed on the action type
//! - `property_rules`: fire on `thngPropertiesChanged`, keyed on one property
//!
//! `when` and `create` are optional here so that a rule missing either one
//! still loads and is rejected by [`crate::validation::validate_rule`] at
//! evaluation time instead of failing the whole table.

use serde::{Deserialize, Serialize};

use crate::condition::{ActionCondition, PropertyCondition};
use crate::templates::OutputTemplate;

/// A predicate/producer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule<W> {
    /// Human-readable identifier used in logs and errors.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<W>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<OutputTemplate>,
}

pub type ActionRule = Rule<ActionCondition>;
pub type PropertyRule = Rule<PropertyCondition>;

impl<W> Rule<W> {
    pub fn new(name: impl Into<String>, when: W, create: OutputTemplate) -> Self {
        Self {
            name: name.into(),
            when: Some(when),
            create: Some(create),
        }
    }
}

/// On-disk form of a rule table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTableDocument {
    #[serde(default)]
    pub action_rules: Vec<ActionRule>,
    #[serde(default)]
    pub property_rules: Vec<PropertyRule>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;
    use serde_json::json;

    #[test]
    fn parses_both_rule_lists() {
        let doc: RuleTableDocument = serde_yaml::from_str(
            r#"
action_rules:
  - name: left-warehouse
    when: { action_type: _LeftWarehouse }
    create: { key: in_transit, value: true }
property_rules:
  - name: overheating
    when: { key: temperature_celsius, op: ">=", value: 100 }
    create: { key: overheating, value: true }
"#,
        )
        .unwrap();

        assert_eq!(doc.action_rules.len(), 1);
        assert_eq!(
            doc.action_rules[0].when.as_ref().unwrap().action_type,
            "_LeftWarehouse"
        );
        let when = doc.property_rules[0].when.as_ref().unwrap();
        assert_eq!(when.op, Operator::Gte);
        assert_eq!(when.value, json!(100));
    }

    #[test]
    fn missing_parts_still_parse() {
        let doc: RuleTableDocument = serde_yaml::from_str(
            r#"
action_rules:
  - name: half-written
    when: { action_type: scans }
"#,
        )
        .unwrap();
        assert!(doc.action_rules[0].create.is_none());
        assert!(doc.property_rules.is_empty());
    }

    #[test]
    fn rule_without_condition_parses() {
        let doc: RuleTableDocument = serde_yaml::from_str(
            r#"
property_rules:
  - name: no-when
    create: { key: damp, value: true }
"#,
        )
        .unwrap();
        let rule = &doc.property_rules[0];
        assert!(rule.when.is_none());
        assert!(rule.create.is_some());
    }
}
