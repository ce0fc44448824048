use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

const DEFAULT_API_URL: &str = "https://api.evrythng.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// `{PROFILE}_{KEY}` when a profile is active and that var is set, else `{KEY}`.
/// Empty values count as unset.
fn lookup(profile: &str, key: &str) -> Option<String> {
    let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
    if !profile.is_empty() {
        if let Some(v) = non_empty(&format!("{profile}_{key}")) {
            return Some(v);
        }
    }
    non_empty(key)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub api: ApiConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `REACTOR_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env::var("REACTOR_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            api: ApiConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  api:         url={}, key={}, timeout={}s",
            self.api.url,
            if self.api.is_configured() { "(set)" } else { "(none)" },
            self.api.timeout_secs
        );
    }
}

// ── Entity API ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the entity-management API. May contain `${VAR}` references.
    pub url: String,
    pub key: Option<String>,
    pub timeout_secs: u64,
}

impl ApiConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: lookup(p, "API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            key: lookup(p, "API_KEY"),
            timeout_secs: lookup(p, "API_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }
}
