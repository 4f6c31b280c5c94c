//! Retry with exponential backoff and a circuit breaker.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Backoff schedule for estimation calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Two short attempts, for local development
    pub fn fast() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(400),
            ..Self::default()
        }
    }

    /// Four attempts with up to ten seconds between them
    pub fn steady() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(400),
            max_delay: Duration::from_secs(10),
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            jitter: false,
            ..Self::default()
        }
    }

    /// Wait before the 0-based `attempt`; zero for the first.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let Some(retry) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };

        let factor = self.backoff_multiplier.max(1.0).powi(retry.min(31) as i32);
        let nanos = (self.initial_delay.as_nanos() as f64 * factor).min(self.max_delay.as_nanos() as f64);
        let nanos = if self.jitter { nanos * (1.0 + 0.25 * jitter_fraction()) } else { nanos };

        Duration::from_nanos(nanos.round() as u64)
    }
}

/// Pseudo-random value in `[0, 1)` from a freshly keyed hasher.
fn jitter_fraction() -> f64 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u8(0);
    (hasher.finish() % 1000) as f64 / 1000.0
}

/// Externally visible breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected until the reset timeout passes
    Open,
    /// Probe calls are let through
    HalfOpen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Successful probes needed to close it again
    pub success_threshold: u32,
    /// How long to reject calls before probing
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { consecutive_failures: u32 },
    Open { since: Instant },
    HalfOpen { probes_passed: u32 },
}

impl Phase {
    const CLOSED: Phase = Phase::Closed { consecutive_failures: 0 };

    fn state(self) -> CircuitState {
        match self {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

/// Stops calling the estimation service after repeated failures.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            phase: Mutex::new(Phase::CLOSED),
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CircuitState {
        self.phase().state()
    }

    /// Whether a call may proceed. An open circuit turns half-open once the
    /// reset timeout has elapsed.
    pub fn can_execute(&self) -> bool {
        let mut phase = self.phase();
        match *phase {
            Phase::Closed { .. } | Phase::HalfOpen { .. } => true,
            Phase::Open { since } if since.elapsed() >= self.config.reset_timeout => {
                *phase = Phase::HalfOpen { probes_passed: 0 };
                tracing::debug!("Estimation circuit half-open, probing");
                true
            }
            Phase::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        let mut phase = self.phase();
        *phase = match *phase {
            Phase::HalfOpen { probes_passed } if probes_passed + 1 < self.config.success_threshold => {
                Phase::HalfOpen {
                    probes_passed: probes_passed + 1,
                }
            }
            Phase::HalfOpen { .. } => {
                tracing::info!("Estimation circuit closed");
                Phase::CLOSED
            }
            Phase::Closed { .. } => Phase::CLOSED,
            open @ Phase::Open { .. } => open,
        };
    }

    pub fn record_failure(&self) {
        let mut phase = self.phase();
        let next = match *phase {
            Phase::Closed { consecutive_failures } if consecutive_failures + 1 < self.config.failure_threshold => {
                Phase::Closed {
                    consecutive_failures: consecutive_failures + 1,
                }
            }
            Phase::Closed { .. } | Phase::HalfOpen { .. } => {
                tracing::warn!(reset_after = ?self.config.reset_timeout, "Estimation circuit opened");
                Phase::Open { since: Instant::now() }
            }
            open @ Phase::Open { .. } => open,
        };
        *phase = next;
    }

    pub fn reset(&self) {
        *self.phase() = Phase::CLOSED;
    }
}
