//! Where the estimation service lives and how hard to try reaching it.
//!
//! Values come from `FOODLOG_*` environment variables; anything unset falls
//! back to the production endpoint.

use crate::error::{ApiError, ApiResult};
use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default production estimation endpoint
const DEFAULT_ESTIMATION_URL: &str = "https://api.foodlog.app/v1";

/// Default path of the estimate operation
const DEFAULT_ESTIMATE_PATH: &str = "estimate";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Deployment the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (estimation service on localhost)
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    /// Parse a `FOODLOG_ENV` value; anything unrecognised is production.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }

    /// Retry policy suited to this environment
    pub fn retry(self) -> RetryConfig {
        match self {
            Self::Development => RetryConfig::fast(),
            Self::Staging => RetryConfig::default(),
            Self::Production => RetryConfig::steady(),
        }
    }
}

/// Everything [`HttpEstimationGateway`](crate::HttpEstimationGateway) needs to reach the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    /// Base URL of the estimation service
    pub base_url: String,
    /// Path of the estimate operation under `base_url`
    pub path: String,
    /// API key sent as a bearer token
    pub api_key: Option<String>,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Deadline for the whole call including retries
    pub total_timeout: Duration,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub environment: Environment,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ESTIMATION_URL.to_string(),
            path: DEFAULT_ESTIMATE_PATH.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            total_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS * 2),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            environment: Environment::default(),
        }
    }
}

impl EstimationConfig {
    /// Read `FOODLOG_ENV`, `FOODLOG_ESTIMATION_URL`, `FOODLOG_ESTIMATION_KEY`
    /// and `FOODLOG_TIMEOUT_SECS` (per-attempt, whole seconds).
    ///
    /// The total deadline is twice the per-attempt timeout.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`EstimationConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let environment = lookup("FOODLOG_ENV").map_or_else(Environment::default, |v| Environment::parse(&v));

        let base_url = lookup("FOODLOG_ESTIMATION_URL").unwrap_or_else(|| match environment {
            Environment::Development => "http://localhost:8787/v1".to_string(),
            Environment::Staging | Environment::Production => DEFAULT_ESTIMATION_URL.to_string(),
        });

        let timeout = match lookup("FOODLOG_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ApiError::config(format!("FOODLOG_TIMEOUT_SECS is not a number: {raw}")))?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let config = Self {
            base_url,
            api_key: lookup("FOODLOG_ESTIMATION_KEY").filter(|k| !k.trim().is_empty()),
            timeout,
            total_timeout: timeout * 2,
            retry: environment.retry(),
            environment,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set the operation path
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Builder-style method to set API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builder-style method to set the per-attempt timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set the overall deadline
    #[must_use]
    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to set circuit breaker config
    #[must_use]
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Full URL of the estimate operation
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    /// Reject URLs without an http(s) scheme and zero timeouts or attempts.
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() || self.total_timeout.is_zero() {
            return Err(ApiError::config("timeouts cannot be zero"));
        }

        if self.retry.max_attempts == 0 {
            return Err(ApiError::config("retry.max_attempts must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EstimationConfig::default();
        assert_eq!(config.endpoint(), "https://api.foodlog.app/v1/estimate");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = EstimationConfig::from_lookup(lookup(&[
            ("FOODLOG_ESTIMATION_URL", "https://staging.example.com/api/"),
            ("FOODLOG_ESTIMATION_KEY", "secret"),
            ("FOODLOG_ENV", "stage"),
            ("FOODLOG_TIMEOUT_SECS", "12"),
        ]))
        .unwrap();

        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.endpoint(), "https://staging.example.com/api/estimate");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_development_defaults() {
        let config = EstimationConfig::from_lookup(lookup(&[("FOODLOG_ENV", "dev")])).unwrap();
        assert!(config.base_url.contains("localhost"));
        assert_eq!(config.retry, RetryConfig::fast());
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_bad_timeout_rejected() {
        let err = EstimationConfig::from_lookup(lookup(&[("FOODLOG_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_builder_and_validation() {
        let config = EstimationConfig::default()
            .with_base_url("http://127.0.0.1:9000")
            .with_path("/v2/estimate")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.endpoint(), "http://127.0.0.1:9000/v2/estimate");
        assert!(config.validate().is_ok());

        assert!(EstimationConfig::default().with_base_url("").validate().is_err());
        assert!(EstimationConfig::default().with_base_url("ftp://x").validate().is_err());
        assert!(EstimationConfig::default().with_timeout(Duration::ZERO).validate().is_err());
    }
}
