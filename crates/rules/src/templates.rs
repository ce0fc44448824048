//! Output templates: the producer half of a rule.
//!
//! A template is a JSON value shaped like the payload it produces. String
//! leaves are rendered with minijinja against the event context. A leaf that
//! is exactly one `{{ expr }}` is evaluated as an expression, so
//! `value: "{{ value }}"` keeps a number a number. Leaves without template
//! syntax are copied as-is. An expression that evaluates to an undefined
//! value renders nothing: its object key is left out of the output.
//!
//! A fresh [`minijinja::Environment`] is built per call since templates are
//! small inline strings, not registered files.

use reactor_core::{Payload, PayloadError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputTemplate(pub Value);

/// Failure to compile or render a template leaf.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("template `{source_text}` does not compile: {message}")]
    Compile { source_text: String, message: String },

    #[error("template `{source_text}` failed to render: {message}")]
    Render { source_text: String, message: String },

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl OutputTemplate {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Check that every string leaf compiles without evaluating it.
    pub fn check(&self) -> Result<(), TemplateError> {
        let env = build_env();
        check_value(&env, &self.0)
    }

    /// Render against `ctx` and classify the result into a [`Payload`].
    pub fn render<C: Serialize>(&self, ctx: &C) -> Result<Payload, TemplateError> {
        let env = build_env();
        let ctx = minijinja::Value::from_serialize(ctx);
        let rendered = render_value(&env, &self.0, &ctx)?.unwrap_or(Value::Null);
        Ok(Payload::classify(&rendered)?)
    }
}

fn build_env() -> minijinja::Environment<'static> {
    let mut env = minijinja::Environment::new();
    env.add_filter("lower", lower_filter);
    env.add_filter("upper", upper_filter);
    env
}

/// Custom filter: lowercase a string.
fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

/// Custom filter: uppercase a string.
fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

fn has_template_syntax(s: &str) -> bool {
    s.contains("{{") || s.contains("{%")
}

/// If `s` is a single `{{ expr }}` block, return `expr`.
fn whole_expression(s: &str) -> Option<&str> {
    let inner = s.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") || inner.contains("{%") {
        return None;
    }
    Some(inner.trim())
}

fn check_value(env: &minijinja::Environment<'static>, value: &Value) -> Result<(), TemplateError> {
    match value {
        Value::String(s) => check_leaf(env, s),
        Value::Array(items) => items.iter().try_for_each(|v| check_value(env, v)),
        Value::Object(map) => map.values().try_for_each(|v| check_value(env, v)),
        _ => Ok(()),
    }
}

fn check_leaf(env: &minijinja::Environment<'static>, s: &str) -> Result<(), TemplateError> {
    if !has_template_syntax(s) {
        return Ok(());
    }
    let compiled = match whole_expression(s) {
        Some(expr) => env.compile_expression(expr).map(|_| ()),
        None => env.template_from_str(s).map(|_| ()),
    };
    compiled.map_err(|e| TemplateError::Compile {
        source_text: s.to_string(),
        message: e.to_string(),
    })
}

fn render_value(
    env: &minijinja::Environment<'static>,
    value: &Value,
    ctx: &minijinja::Value,
) -> Result<Option<Value>, TemplateError> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| render_value(env, v, ctx).map(|r| r.unwrap_or(Value::Null)))
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Some(Value::Array(items))),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                if let Some(rendered) = render_value(env, v, ctx)? {
                    out.insert(key.clone(), rendered);
                }
            }
            Ok(Some(Value::Object(out)))
        }
        Value::String(s) => render_leaf(env, s, ctx),
        other => Ok(Some(other.clone())),
    }
}

/// `None` when the leaf is a single expression that evaluates to undefined.
fn render_leaf(
    env: &minijinja::Environment<'static>,
    s: &str,
    ctx: &minijinja::Value,
) -> Result<Option<Value>, TemplateError> {
    if !has_template_syntax(s) {
        return Ok(Some(Value::String(s.to_string())));
    }

    let render_err = |message: String| TemplateError::Render {
        source_text: s.to_string(),
        message,
    };

    match whole_expression(s) {
        Some(expr) => {
            let compiled = env
                .compile_expression(expr)
                .map_err(|e| render_err(e.to_string()))?;
            let result = compiled.eval(ctx).map_err(|e| render_err(e.to_string()))?;
            if result.is_undefined() {
                return Ok(None);
            }
            serde_json::to_value(&result)
                .map(Some)
                .map_err(|e| render_err(e.to_string()))
        }
        None => env
            .render_str(s, ctx)
            .map(|text| Some(Value::String(text)))
            .map_err(|e| render_err(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactor_core::PropertyPayload;
    use serde_json::json;

    fn template(value: Value) -> OutputTemplate {
        OutputTemplate::new(value)
    }

    #[test]
    fn literal_template_renders_unchanged() {
        let payload = template(json!({ "key": "overheating", "value": true }))
            .render(&json!({}))
            .unwrap();
        assert_eq!(payload, Payload::Property(PropertyPayload::new("overheating", true)));
    }

    #[test]
    fn whole_expression_keeps_type() {
        let payload = template(json!({ "key": "last_temperature", "value": "{{ value }}" }))
            .render(&json!({ "key": "temperature_celsius", "value": 105 }))
            .unwrap();
        assert_eq!(
            payload,
            Payload::Property(PropertyPayload::new("last_temperature", 105))
        );
    }

    #[test]
    fn mixed_text_renders_as_string() {
        let payload = template(json!({
            "type": "_ForecastAlert",
            "customFields": { "summary": "{{ key }} is {{ value | upper }}" }
        }))
        .render(&json!({ "key": "weather_report", "value": "rain" }))
        .unwrap();
        match payload {
            Payload::Action(action) => assert_eq!(
                action.custom_fields.unwrap()["summary"],
                json!("weather_report is RAIN")
            ),
            other => panic!("expected action, got {other:?}"),
        }
    }

    #[test]
    fn nested_context_access() {
        let payload = template(json!({ "key": "last_scan_type", "value": "{{ action.type }}" }))
            .render(&json!({ "action": { "type": "scans" }, "thng": "T1" }))
            .unwrap();
        assert_eq!(
            payload,
            Payload::Property(PropertyPayload::new("last_scan_type", "scans"))
        );
    }

    #[test]
    fn check_rejects_broken_syntax() {
        let result = template(json!({ "key": "k", "value": "{{ unclosed" })).check();
        assert!(matches!(result, Err(TemplateError::Compile { .. })));

        let result = template(json!({ "key": "k", "value": "{% if %}x{% endif %}" })).check();
        assert!(matches!(result, Err(TemplateError::Compile { .. })));
    }

    #[test]
    fn check_accepts_plain_and_templated_leaves() {
        template(json!({ "type": "_Alert", "customFields": { "a": "plain", "b": "{{ value }}", "c": [1, "{{ key }}"] } }))
            .check()
            .unwrap();
    }

    #[test]
    fn unclassifiable_output_is_reported() {
        let result = template(json!({ "foo": 1 })).render(&json!({}));
        assert!(matches!(result, Err(TemplateError::Payload(_))));
    }

    #[test]
    fn undefined_expression_yields_no_value() {
        let result = template(json!({ "key": "k", "value": "{{ missing }}" })).render(&json!({}));
        assert!(matches!(result, Err(TemplateError::Payload(_))));
    }

    #[test]
    fn null_expression_is_kept() {
        let payload = template(json!({ "key": "last_error", "value": "{{ value }}" }))
            .render(&json!({ "key": "error", "value": null }))
            .unwrap();
        assert_eq!(
            payload,
            Payload::Property(PropertyPayload::new("last_error", Value::Null))
        );
    }
}
