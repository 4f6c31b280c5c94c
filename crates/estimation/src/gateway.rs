//! The estimation contract and its HTTP implementation.

use crate::config::EstimationConfig;
use crate::error::{ApiError, ApiResult};
use crate::resilience::{CircuitBreaker, CircuitState};
use foodlog_core::models::NutritionEstimate;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

const CLIENT_USER_AGENT: &str = concat!("foodlog-estimation/", env!("CARGO_PKG_VERSION"));

/// Turns a photo into a nutrition estimate.
///
/// Implementations must resolve in bounded time and report every failure
/// as an [`ApiError`]; callers treat any error as "estimation failed".
pub trait EstimationGateway: Send + Sync {
    /// Estimate the meal shown in a `data:<mime>;base64,<payload>` URI.
    fn estimate(&self, photo_data_uri: &str) -> impl Future<Output = ApiResult<NutritionEstimate>> + Send;
}

/// Request body of the estimate operation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest<'a> {
    pub photo_data_uri: &'a str,
}

/// Estimation gateway over HTTP with built-in resilience patterns
///
/// Adds to `reqwest`:
/// - Automatic retry with exponential backoff
/// - Circuit breaker to stop hammering a failing service
/// - An overall deadline so a call never hangs
/// - Request correlation IDs for tracing
#[derive(Clone)]
pub struct HttpEstimationGateway {
    inner: Client,
    config: Arc<EstimationConfig>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl std::fmt::Debug for HttpEstimationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEstimationGateway")
            .field("endpoint", &self.config.endpoint())
            .field("circuit", &self.circuit_breaker.state())
            .finish_non_exhaustive()
    }
}

impl HttpEstimationGateway {
    /// Create a gateway configured from environment variables
    pub fn from_env() -> ApiResult<Self> {
        Self::with_config(EstimationConfig::from_env()?)
    }

    /// Create a gateway with specific configuration
    pub fn with_config(config: EstimationConfig) -> ApiResult<Self> {
        let inner = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Request)?;
        Self::with_client(config, inner)
    }

    /// Create a gateway around a prepared `reqwest` client (proxies, TLS roots).
    pub fn with_client(config: EstimationConfig, inner: Client) -> ApiResult<Self> {
        config.validate()?;
        let circuit_breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));
        Ok(Self {
            inner,
            config: Arc::new(config),
            circuit_breaker,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &EstimationConfig {
        &self.config
    }

    /// Get circuit breaker state
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Reset the circuit breaker
    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    async fn request_estimate(&self, photo_data_uri: &str) -> ApiResult<NutritionEstimate> {
        let request_id = Uuid::new_v4().to_string();
        let url = self.config.endpoint();

        if !self.circuit_breaker.can_execute() {
            warn!(request_id = %request_id, url = %url, "Circuit breaker is open, rejecting request");
            return Err(ApiError::CircuitOpen);
        }

        let body = EstimateRequest { photo_data_uri };
        let deadline = self.config.total_timeout;
        let estimate = tokio::time::timeout(deadline, self.execute_with_retry(&request_id, &url, &body))
            .await
            .map_err(|_| {
                warn!(request_id = %request_id, deadline_ms = deadline.as_millis(), "Estimation deadline exceeded");
                ApiError::Timeout(deadline)
            })??;

        estimate
            .validate()
            .map_err(|e| ApiError::InvalidEstimate(e.to_string()))?;
        Ok(estimate)
    }

    /// Execute request with retry logic
    async fn execute_with_retry(
        &self,
        request_id: &str,
        url: &str,
        body: &EstimateRequest<'_>,
    ) -> ApiResult<NutritionEstimate> {
        let retry_config = &self.config.retry;
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..retry_config.max_attempts {
            if attempt > 0 {
                let delay = retry_config.delay_for_attempt(attempt);
                debug!(
                    request_id = %request_id,
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying after delay"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            let result = self.execute_single_request(request_id, url, body).await;
            let elapsed = start.elapsed();

            match result {
                Ok(value) => {
                    self.circuit_breaker.record_success();
                    debug!(
                        request_id = %request_id,
                        attempt = attempt + 1,
                        elapsed_ms = elapsed.as_millis(),
                        "Estimate received"
                    );
                    return Ok(value);
                }
                Err(e) => {
                    // A rejected request says nothing about service health.
                    if e.is_retryable() {
                        self.circuit_breaker.record_failure();
                    }

                    if e.is_retryable() && attempt + 1 < retry_config.max_attempts {
                        debug!(request_id = %request_id, attempt = attempt + 1, error = %e, "Request failed, will retry");
                        last_error = Some(e);
                    } else {
                        debug!(request_id = %request_id, attempt = attempt + 1, error = %e, "Request failed, not retrying");
                        return Err(e);
                    }
                }
            }
        }

        Err(ApiError::RetriesExhausted {
            attempts: retry_config.max_attempts,
            last_error: last_error.map_or_else(|| "Unknown error".to_string(), |e| e.to_string()),
        })
    }

    /// Execute a single request without retry
    async fn execute_single_request(
        &self,
        request_id: &str,
        url: &str,
        body: &EstimateRequest<'_>,
    ) -> ApiResult<NutritionEstimate> {
        let mut request = self
            .inner
            .post(url)
            .header(X_REQUEST_ID, request_id)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .json(body);

        if let Some(ref key) = self.config.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.timeout)
            } else {
                ApiError::Request(e)
            }
        })?;
        handle_response(response).await
    }
}

/// Check the status and decode the body.
async fn handle_response(response: Response) -> ApiResult<NutritionEstimate> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        Ok(serde_json::from_str(&text)?)
    } else {
        let message = if text.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error").to_string()
        } else {
            text
        };
        Err(ApiError::api_response(status.as_u16(), message))
    }
}

impl EstimationGateway for HttpEstimationGateway {
    fn estimate(&self, photo_data_uri: &str) -> impl Future<Output = ApiResult<NutritionEstimate>> + Send {
        self.request_estimate(photo_data_uri)
    }
}
