//! Client configuration.
//!
//! # Design
//! `ClientConfig` deserializes from TOML with defaults for everything except
//! the instance URL and the API client credentials. The same fields can be
//! read from `JAMFPRO_*` environment variables. `validate` runs on every
//! load path so a client is never built around an unusable URL.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::reconcile::ReconcilePolicy;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Connection settings for one Jamf Pro instance.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Static headers added to every request, e.g. `User-Agent`.
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// `[reconcile]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub initial_delay_ms: u64,
    pub mutation_max_attempts: Option<u32>,
    pub delete_max_attempts: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        let policy = ReconcilePolicy::default();
        Self {
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            mutation_max_attempts: policy.mutation_max_attempts,
            delete_max_attempts: policy.delete_max_attempts,
        }
    }
}

impl From<&ReconcileConfig> for ReconcilePolicy {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            mutation_max_attempts: config.mutation_max_attempts,
            delete_max_attempts: config.delete_max_attempts,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("extra_headers", &self.extra_headers)
            .field("reconcile", &self.reconcile)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            extra_headers: BTreeMap::new(),
            reconcile: ReconcileConfig::default(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `JAMFPRO_BASE_URL`, `JAMFPRO_CLIENT_ID`, `JAMFPRO_CLIENT_SECRET`
    /// and the optional `JAMFPRO_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ApiError::Config(format!("{key} is not set")))
        };
        let mut config = Self::new(
            &required("JAMFPRO_BASE_URL")?,
            &required("JAMFPRO_CLIENT_ID")?,
            &required("JAMFPRO_CLIENT_SECRET")?,
        );
        if let Some(raw) = lookup("JAMFPRO_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = raw.parse().map_err(|_| {
                ApiError::Config(format!("JAMFPRO_REQUEST_TIMEOUT_SECS is not a number: {raw}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("base_url {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!("base_url must be http(s): {}", self.base_url)));
        }
        if self.client_id.is_empty() {
            return Err(ApiError::Config("client_id is empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ApiError::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy::from(&self.reconcile)
    }
}
