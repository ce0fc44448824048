//! Rule predicates.
//!
//! Action rules match on the action type. Property rules match one property
//! key and compare its new value with an operator. Comparisons are loose:
//! numeric strings compare as numbers, and `includes`/`is` work on the
//! stringified value.

use std::cmp::Ordering;

use reactor_core::Action;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Matches actions of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCondition {
    #[serde(alias = "type")]
    pub action_type: String,
}

impl ActionCondition {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
        }
    }

    pub fn matches(&self, action: &Action) -> bool {
        action.action_type == self.action_type
    }
}

/// Matches one changed property whose new value satisfies `op value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCondition {
    /// Property key. A trailing `*` matches any key with that prefix.
    pub key: String,
    pub op: Operator,
    pub value: Value,
}

impl PropertyCondition {
    pub fn new(key: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, key: &str, new_value: &Value) -> bool {
        self.matches_key(key) && self.op.apply(new_value, &self.value)
    }

    fn matches_key(&self, key: &str) -> bool {
        match self.key.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == self.key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Gte,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Lte,
    #[serde(alias = "==")]
    Eq,
    #[serde(alias = "!=")]
    Neq,
    /// Substring match on the stringified value.
    Includes,
    /// Exact match on the stringified value.
    Is,
}

impl Operator {
    /// Evaluate `candidate <op> expected`.
    pub fn apply(self, candidate: &Value, expected: &Value) -> bool {
        match self {
            Operator::Gt => compare(candidate, expected) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                compare(candidate, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => compare(candidate, expected) == Some(Ordering::Less),
            Operator::Lte => matches!(
                compare(candidate, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Eq => loose_eq(candidate, expected),
            Operator::Neq => !loose_eq(candidate, expected),
            Operator::Includes => stringify(candidate).contains(stringify(expected).as_str()),
            Operator::Is => stringify(candidate) == stringify(expected),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Numeric order when both sides are numeric, else string order for two strings.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => stringify(a) == stringify(b),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_comparisons() {
        assert!(Operator::Gt.apply(&json!(105), &json!(100)));
        assert!(!Operator::Gt.apply(&json!(100), &json!(100)));
        assert!(Operator::Gte.apply(&json!(100), &json!(100)));
        assert!(Operator::Lt.apply(&json!(-3.5), &json!(0)));
        assert!(Operator::Lte.apply(&json!("99"), &json!(100)));
    }

    #[test]
    fn non_numeric_values_do_not_order_against_numbers() {
        assert!(!Operator::Gt.apply(&json!("hot"), &json!(100)));
        assert!(!Operator::Lt.apply(&json!(null), &json!(100)));
    }

    #[test]
    fn loose_equality() {
        assert!(Operator::Eq.apply(&json!("100"), &json!(100)));
        assert!(Operator::Eq.apply(&json!("on"), &json!("on")));
        assert!(Operator::Neq.apply(&json!("off"), &json!("on")));
    }

    #[test]
    fn string_operators() {
        assert!(Operator::Includes.apply(&json!("heavy rain expected"), &json!("rain")));
        assert!(!Operator::Includes.apply(&json!("sunny"), &json!("rain")));
        assert!(Operator::Is.apply(&json!(true), &json!("true")));
    }

    #[test]
    fn property_condition_requires_matching_key() {
        let cond = PropertyCondition::new("temperature_celsius", Operator::Gte, 100);
        assert!(cond.matches("temperature_celsius", &json!(105)));
        assert!(!cond.matches("humidity", &json!(105)));
        assert!(!cond.matches("temperature_celsius", &json!(20)));
    }

    #[test]
    fn key_prefix_pattern() {
        let cond = PropertyCondition::new("temperature_*", Operator::Gt, 100);
        assert!(cond.matches("temperature_engine", &json!(120)));
        assert!(!cond.matches("humidity", &json!(120)));

        let any = PropertyCondition::new("*", Operator::Is, "error");
        assert!(any.matches("status", &json!("error")));
    }

    #[test]
    fn action_condition_matches_type() {
        let cond = ActionCondition::new("scans");
        assert!(cond.matches(&Action::new("scans")));
        assert!(!cond.matches(&Action::new("_LeftWarehouse")));
    }

    #[test]
    fn operator_symbols_deserialize() {
        let op: Operator = serde_yaml::from_str("\"<=\"").unwrap();
        assert_eq!(op, Operator::Lte);
        let op: Operator = serde_yaml::from_str("includes").unwrap();
        assert_eq!(op, Operator::Includes);
    }
}
