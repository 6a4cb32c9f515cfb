//! Gateway configuration

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::errors::{GatewayError, GatewayResult};

/// Where and how a gateway calls its endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Operation URL requests are posted to
    pub endpoint: String,

    /// Base URL of the schema exchange (default: `<endpoint origin>/schemas`)
    #[serde(default)]
    pub schema_endpoint: Option<String>,

    /// Per-request timeout (default: 30000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per call, including the first (default: 3)
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Backoff base; attempt `n` waits `backoff_ms * n^2` (default: 100)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    100
}

impl GatewayConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            schema_endpoint: None,
            timeout_ms: default_timeout_ms(),
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }

    pub fn with_schema_endpoint(mut self, url: impl Into<String>) -> Self {
        self.schema_endpoint = Some(url.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> GatewayResult<()> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| GatewayError::InvalidConfig(format!("endpoint '{}': {}", self.endpoint, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidConfig(format!(
                "endpoint '{}' must use http or https",
                self.endpoint
            )));
        }
        if let Some(schema_endpoint) = &self.schema_endpoint {
            Url::parse(schema_endpoint)
                .map_err(|e| GatewayError::InvalidConfig(format!("schema_endpoint '{}': {}", schema_endpoint, e)))?;
        }
        if self.attempts == 0 {
            return Err(GatewayError::InvalidConfig("attempts must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(GatewayError::InvalidConfig("timeout_ms must be positive".into()));
        }
        Ok(())
    }

    /// Schema exchange base URL, without a trailing slash
    pub fn schema_endpoint(&self) -> String {
        match &self.schema_endpoint {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let origin = Url::parse(&self.endpoint)
                    .map(|url| url.origin().ascii_serialization())
                    .unwrap_or_else(|_| self.endpoint.trim_end_matches('/').to_string());
                format!("{}/schemas", origin)
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = u64::from(attempt).saturating_mul(u64::from(attempt));
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}
