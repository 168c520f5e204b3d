//! Per-source circuit breaker.
//!
//! A provider that keeps failing is taken out of rotation for a while so that
//! aggregation calls stop waiting on it.
//!
//! # Circuit States
//!
//! ```text
//! CLOSED (healthy) --[N failures]--> OPEN (skipped) --[timeout]--> HALF_OPEN (probing)
//!                                                                        |
//!                                      <--[failure]--                    |
//!                                                                        |
//! CLOSED <---------------------------[M successes]-----------------------+
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive tripping failures before the circuit opens.
    pub failure_threshold: u32,

    /// Successful probes in half-open state before the circuit closes.
    pub success_threshold: u32,

    /// Time to wait before moving from Open to HalfOpen.
    pub recovery_timeout: Duration,

    /// Applied to `recovery_timeout` when the provider answered 429.
    pub rate_limit_backoff_multiplier: f32,

    pub max_recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(30),
            rate_limit_backoff_multiplier: 2.0,
            max_recovery_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    last_error: Option<String>,
    recovery_timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_error: Option<String>,
    pub retry_after_secs: Option<u64>,
}

/// Thread-safe breaker for one provider.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let inner = Inner {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
            last_error: None,
            recovery_timeout: config.recovery_timeout,
        };
        Self {
            name: name.into(),
            config,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(source = %self.name, "Recovered from poisoned mutex");
            poisoned.into_inner()
        })
    }

    /// Current state, applying the lazy Open → HalfOpen transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock_inner();
        self.maybe_half_open(&mut inner);
        inner.state
    }

    /// Whether a call may go through right now.
    pub fn allows_request(&self) -> bool {
        self.state() != CircuitState::Open
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let mut inner = self.lock_inner();
        self.maybe_half_open(&mut inner);
        let retry_after_secs = match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(t)) => {
                Some(inner.recovery_timeout.saturating_sub(t.elapsed()).as_secs())
            }
            _ => None,
        };
        CircuitBreakerStats {
            state: inner.state,
            failure_count: inner.failure_count,
            last_error: inner.last_error.clone(),
            retry_after_secs,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock_inner();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    tracing::info!(source = %self.name, "Circuit breaker closed");
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.last_error = None;
                    inner.recovery_timeout = self.config.recovery_timeout;
                }
            }
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    /// Record a failed call. Errors that do not indicate an unhealthy
    /// upstream (e.g. a malformed body) are ignored.
    pub fn record_failure(&self, error: &AppError) {
        if !error.should_trip_circuit() {
            return;
        }
        let mut inner = self.lock_inner();
        inner.last_error = Some(error.to_string());

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    tracing::warn!(
                        source = %self.name,
                        failures = inner.failure_count,
                        error = %error,
                        "Circuit breaker opened"
                    );
                    self.open(&mut inner, error.is_rate_limited());
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!(source = %self.name, error = %error, "Circuit breaker probe failed");
                self.open(&mut inner, error.is_rate_limited());
            }
            CircuitState::Open => {}
        }
    }

    fn open(&self, inner: &mut Inner, rate_limited: bool) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.success_count = 0;
        if rate_limited {
            inner.recovery_timeout = std::cmp::min(
                inner
                    .recovery_timeout
                    .mul_f32(self.config.rate_limit_backoff_multiplier),
                self.config.max_recovery_timeout,
            );
        }
    }

    fn maybe_half_open(&self, inner: &mut Inner) {
        if inner.state == CircuitState::Open
            && let Some(opened_at) = inner.opened_at
            && opened_at.elapsed() >= inner.recovery_timeout
        {
            tracing::info!(source = %self.name, "Circuit breaker half-open");
            inner.state = CircuitState::HalfOpen;
            inner.success_count = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> AppError {
        AppError::NetworkError("reset".into())
    }

    fn quick(failures: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: failures,
            success_threshold: 2,
            recovery_timeout: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = CircuitBreaker::new("test", quick(3));
        cb.record_failure(&network());
        cb.record_failure(&network());
        assert!(cb.allows_request());
        cb.record_failure(&network());
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allows_request());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = CircuitBreaker::new("test", quick(2));
        cb.record_failure(&network());
        cb.record_success();
        cb.record_failure(&network());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_non_tripping_errors_ignored() {
        let cb = CircuitBreaker::new("test", quick(1));
        cb.record_failure(&AppError::ParseError("bad".into()));
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().failure_count, 0);
    }

    #[test]
    fn test_half_open_then_closed() {
        let cb = CircuitBreaker::new("test", quick(1));
        cb.record_failure(&network());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_reopens_on_failure() {
        let cb = CircuitBreaker::new("test", quick(1));
        cb.record_failure(&network());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_failure(&network());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_rate_limit_extends_recovery_capped() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(200),
            ..Default::default()
        };
        let cb = CircuitBreaker::new("test", config);
        cb.record_failure(&AppError::HttpError {
            status: 429,
            message: "slow down".into(),
        });
        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Open);
        let retry = stats.retry_after_secs.unwrap();
        assert!(retry > 200 && retry <= 300, "retry_after_secs = {retry}");
    }
}
