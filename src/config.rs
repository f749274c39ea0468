use crate::backend::{GoogleTranslateV2, GoogleTranslateV3};
use crate::error::DEFAULT_APP_NAME;
use anyhow::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // Service
    pub app_name: String,
    pub port: u16,
    pub liveness_probe_port: u16,
    pub graceful_shutdown: Duration,
    /// How long the listener stays open after shutdown begins
    pub shutdown_drain: Duration,
    pub development_mode: bool,

    // Upstream
    pub upstream_timeout: Duration,
    pub backends: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// In-memory backends, no credentials needed
    Mock,
    Google(GoogleConfig),
}

#[derive(Clone, PartialEq, Eq)]
pub struct GoogleConfig {
    pub v2_api_key: String,
    pub v2_base_url: String,
    /// Parent resource, e.g. `projects/my-project/locations/us-central1`
    pub v3_project_key: String,
    pub v3_access_token: Option<String>,
    pub v3_base_url: String,
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("v2_api_key", &"***")
            .field("v2_base_url", &self.v2_base_url)
            .field("v3_project_key", &self.v3_project_key)
            .field("v3_access_token", &self.v3_access_token.as_ref().map(|_| "***"))
            .field("v3_base_url", &self.v3_base_url)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset values take their defaults;
    /// a set but unparseable value is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let backends = if flag(var("USE_MOCK_BACKENDS")) {
            BackendConfig::Mock
        } else {
            BackendConfig::Google(GoogleConfig {
                v2_api_key: var("GOOGLE_TRANSLATE_V2_API_KEY")
                    .context("GOOGLE_TRANSLATE_V2_API_KEY not set")?,
                v2_base_url: var("GOOGLE_TRANSLATE_V2_BASE_URL")
                    .unwrap_or_else(|| GoogleTranslateV2::DEFAULT_BASE_URL.to_string()),
                v3_project_key: var("GOOGLE_TRANSLATE_V3_PROJECT_KEY")
                    .context("GOOGLE_TRANSLATE_V3_PROJECT_KEY not set")?,
                v3_access_token: var("GOOGLE_TRANSLATE_V3_ACCESS_TOKEN"),
                v3_base_url: var("GOOGLE_TRANSLATE_V3_BASE_URL")
                    .unwrap_or_else(|| GoogleTranslateV3::DEFAULT_BASE_URL.to_string()),
            })
        };

        let config = Self {
            app_name: var("APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            port: parsed("PORT", var("PORT"), 8080)?,
            liveness_probe_port: parsed("LIVENESS_PROBE_PORT", var("LIVENESS_PROBE_PORT"), 8081)?,
            graceful_shutdown: Duration::from_secs(parsed(
                "GRACEFUL_SHUTDOWN_SECONDS",
                var("GRACEFUL_SHUTDOWN_SECONDS"),
                10,
            )?),
            shutdown_drain: Duration::from_secs(parsed(
                "SHUTDOWN_DRAIN_SECONDS",
                var("SHUTDOWN_DRAIN_SECONDS"),
                2,
            )?),
            development_mode: flag(var("DEVELOPMENT_MODE")),
            upstream_timeout: Duration::from_secs(parsed(
                "UPSTREAM_TIMEOUT_SECONDS",
                var("UPSTREAM_TIMEOUT_SECONDS"),
                30,
            )?),
            backends,
        };

        if config.port == config.liveness_probe_port {
            bail!(
                "PORT and LIVENESS_PROBE_PORT must differ (both are {})",
                config.port
            );
        }

        Ok(config)
    }
}

fn parsed<T>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
    }
}

/// Only the literal `true` (any case) enables a flag.
fn flag(value: Option<String>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}
