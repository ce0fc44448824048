//! Structural rule validation.
//!
//! [`validate_rule`] is the per-event gate the evaluator runs before every
//! rule branch. [`validate_table`] walks a whole table and collects a report
//! for the worker's `validate` command.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::schema::Rule;
use crate::table::RuleTable;
use crate::templates::OutputTemplate;

/// Check that `rule` has a predicate and an invocable producer.
///
/// Returns both parts on success. On failure the error carries the
/// serialized rule.
pub fn validate_rule<W: Serialize>(rule: &Rule<W>) -> Result<(&W, &OutputTemplate), RuleError> {
    let invalid = |reason: String| RuleError::InvalidRule {
        rule: serde_json::to_string(rule).unwrap_or_else(|_| rule.name.clone()),
        reason,
    };

    let when = rule
        .when
        .as_ref()
        .ok_or_else(|| invalid("missing `when`".to_string()))?;
    let create = rule
        .create
        .as_ref()
        .ok_or_else(|| invalid("missing `create`".to_string()))?;
    create
        .check()
        .map_err(|e| invalid(format!("`create` is not invocable: {e}")))?;

    Ok((when, create))
}

// ── Table report ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A rule that will fail every evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Location in the table, e.g. `"property_rules[1]"`.
    pub path: String,
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: String, rule: &str, message: String) {
        self.valid = false;
        self.errors.push(ValidationError {
            path,
            rule: rule.to_string(),
            message,
        });
    }

    fn warn(&mut self, path: String, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path,
            message: message.into(),
        });
    }
}

/// Validate every rule in both lists.
pub fn validate_table(table: &RuleTable) -> ValidationResult {
    let mut result = ValidationResult::new();
    check_list("action_rules", &table.action_rules, &mut result);
    check_list("property_rules", &table.property_rules, &mut result);

    if table.is_empty() {
        result.warn(String::new(), "rule table has no rules; no event will produce output");
    }
    result
}

fn check_list<W: Serialize>(list: &str, rules: &[Rule<W>], result: &mut ValidationResult) {
    let mut seen = HashSet::new();
    for (i, rule) in rules.iter().enumerate() {
        let path = format!("{list}[{i}]");
        if let Err(e) = validate_rule(rule) {
            result.error(path.clone(), &rule.name, e.to_string());
        }
        if rule.name.is_empty() {
            result.warn(path.clone(), "rule has no name; logs will not identify it");
        } else if !seen.insert(rule.name.as_str()) {
            result.warn(path, format!("duplicate rule name '{}'", rule.name));
        }
    }
}
