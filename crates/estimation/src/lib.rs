//! Nutrition estimation gateway for foodlog
//!
//! The estimation service is external: a photo goes in as a `data:` URI and a
//! structured [`NutritionEstimate`](foodlog_core::models::NutritionEstimate)
//! comes back. This crate defines the [`EstimationGateway`] contract and an
//! HTTP implementation with:
//!
//! - **Environment-based configuration**: URL, key, environment and timeout from env vars
//! - **Retry with exponential backoff**: automatic retry for transient failures
//! - **Circuit breaker**: stop calling a service that keeps failing
//! - **Deadlines**: per-attempt and overall timeouts, so a call never hangs
//! - **Request correlation**: every call carries an `X-Request-ID`
//!
//! # Example
//!
//! ```rust,no_run
//! use foodlog_estimation::{EstimationGateway, HttpEstimationGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = HttpEstimationGateway::from_env()?;
//!     let estimate = gateway.estimate("data:image/jpeg;base64,/9j/4AAQ").await?;
//!     println!("{} ~ {} kcal", estimate.food_item, estimate.calorie_estimate);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod resilience;

pub use config::{EstimationConfig, Environment};
pub use error::{ApiError, ApiResult};
pub use gateway::{EstimateRequest, EstimationGateway, HttpEstimationGateway};
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
