//! HTTP client for the entity-management API.
//!
//! Actions are created with `POST {base}/actions/{type}` and carry the target
//! entity in their `thng` field. Property updates go to
//! `PUT {base}/thngs/{id}/properties`, which takes a list of updates.

use std::time::Duration;

use reactor_core::config::ApiConfig;
use reactor_core::{ActionPayload, PropertyPayload};
use reqwest::Url;
use serde_json::Value;

use crate::traits::{EntityApi, RemoteError};

/// Talks to the entity API over HTTPS with a shared connection pool.
///
/// Environment variable references (`${VAR_NAME}`) in the base URL and the
/// API key are resolved at construction time.
#[derive(Debug)]
pub struct HttpEntityApi {
    /// Base URL (env vars already resolved).
    base_url: Url,
    /// Sent verbatim in the `Authorization` header when set.
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpEntityApi {
    /// Create a new client.
    ///
    /// Missing env vars or an unparsable base URL produce a
    /// [`RemoteError::Config`] error.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let resolved_url = resolve_env_vars(base_url)?;
        let base_url = Url::parse(&resolved_url)
            .map_err(|e| RemoteError::Config(format!("invalid API url {resolved_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Config(format!(
                "API url cannot be a base: {resolved_url}"
            )));
        }

        let api_key = api_key.map(resolve_env_vars).transpose()?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::Http)?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    /// Construct from the `API_*` section of the process config.
    pub fn from_config(config: &ApiConfig) -> Result<Self, RemoteError> {
        Self::new(
            &config.url,
            config.key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, RemoteError> {
        let request = match &self.api_key {
            Some(key) => request.header(reqwest::header::AUTHORIZATION, key),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body_text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(RemoteError::Status {
                operation,
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(operation, status = %status, "entity API call succeeded");

        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text).map_err(|e| RemoteError::Serialize(e.to_string()))
    }
}

#[async_trait::async_trait]
impl EntityApi for HttpEntityApi {
    async fn create_action(
        &self,
        entity_id: &str,
        action: &ActionPayload,
    ) -> Result<Value, RemoteError> {
        let body = action_body(entity_id, action)?;
        let url = self.endpoint(&["actions", &action.action_type]);
        let request = self.client.post(url).json(&body);
        self.send("create action", request).await
    }

    async fn update_property(
        &self,
        entity_id: &str,
        property: &PropertyPayload,
    ) -> Result<Value, RemoteError> {
        let url = self.endpoint(&["thngs", entity_id, "properties"]);
        let request = self.client.put(url).json(&[property]);
        self.send("update property", request).await
    }

    fn api_name(&self) -> &str {
        "http"
    }
}

/// Serialize an action payload and attach it to `entity_id`.
///
/// The dispatch target wins: any `thngId` the payload carries is dropped so
/// the body names exactly one entity.
fn action_body(entity_id: &str, action: &ActionPayload) -> Result<Value, RemoteError> {
    let mut body =
        serde_json::to_value(action).map_err(|e| RemoteError::Serialize(e.to_string()))?;
    if let Some(obj) = body.as_object_mut() {
        obj.remove("thngId");
        obj.insert("thng".to_string(), Value::String(entity_id.to_string()));
    }
    Ok(body)
}

/// Expand `${VAR_NAME}` references from the process environment.
fn resolve_env_vars(input: &str) -> Result<String, RemoteError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let reference = &rest[start + 2..];
        let end = reference.find('}').ok_or_else(|| {
            RemoteError::Config(format!("unclosed env var reference in: {input}"))
        })?;
        let name = &reference[..end];
        let value = std::env::var(name)
            .map_err(|_| RemoteError::Config(format!("env var not found: {name}")))?;
        out.push_str(&value);
        rest = &reference[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client_for(url: &str) -> HttpEntityApi {
        HttpEntityApi::new(url, None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("ENTITY_API_TEST_HOST", "api.example.com");
        let result = resolve_env_vars("https://${ENTITY_API_TEST_HOST}/v2").unwrap();
        assert_eq!(result, "https://api.example.com/v2");
        std::env::remove_var("ENTITY_API_TEST_HOST");
    }

    #[test]
    fn resolve_env_vars_missing() {
        let result = resolve_env_vars("https://${ABSOLUTELY_NOT_SET_98765}/");
        match result.unwrap_err() {
            RemoteError::Config(msg) => assert!(msg.contains("ABSOLUTELY_NOT_SET_98765")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn resolve_env_vars_unclosed() {
        match resolve_env_vars("https://${UNCLOSED/").unwrap_err() {
            RemoteError::Config(msg) => assert!(msg.contains("unclosed")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn api_key_is_resolved_from_env() {
        std::env::set_var("ENTITY_API_TEST_KEY", "operator-key");
        let api = HttpEntityApi::new(
            "https://api.example.com",
            Some("${ENTITY_API_TEST_KEY}"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(api.api_key.as_deref(), Some("operator-key"));
        std::env::remove_var("ENTITY_API_TEST_KEY");
    }

    #[test]
    fn rejects_invalid_url() {
        let result = HttpEntityApi::new("not a url", None, Duration::from_secs(5));
        assert!(matches!(result, Err(RemoteError::Config(_))));
    }

    #[test]
    fn endpoints_are_joined_and_encoded() {
        let api = client_for("https://api.example.com/");
        assert_eq!(
            api.endpoint(&["actions", "_LeftWarehouse"]).as_str(),
            "https://api.example.com/actions/_LeftWarehouse"
        );

        let api = client_for("https://api.example.com/v2");
        assert_eq!(
            api.endpoint(&["thngs", "T 1", "properties"]).as_str(),
            "https://api.example.com/v2/thngs/T%201/properties"
        );
    }

    #[test]
    fn action_body_carries_target() {
        let action = ActionPayload {
            action_type: "_ForecastAlert".to_string(),
            thng_id: None,
            custom_fields: None,
            extra: Default::default(),
        };
        let body = action_body("T1", &action).unwrap();
        assert_eq!(body, json!({ "type": "_ForecastAlert", "thng": "T1" }));
    }

    #[test]
    fn target_replaces_payload_thng_id() {
        let action = ActionPayload {
            action_type: "scans".to_string(),
            thng_id: Some("OTHER".to_string()),
            custom_fields: None,
            extra: Default::default(),
        };
        let body = action_body("T1", &action).unwrap();
        assert_eq!(body, json!({ "type": "scans", "thng": "T1" }));
    }

    #[test]
    fn api_name_is_http() {
        assert_eq!(client_for("https://api.example.com").api_name(), "http");
    }
}
