//! Circuit breaker guarding the language-model backend.
//!
//! One instance is shared by every concurrent workflow invocation. All state
//! lives behind a single mutex so a burst of concurrent failures cannot lose
//! a transition. The OPEN -> HALF_OPEN move happens lazily inside
//! [`CircuitBreaker::allow`]; there is no background timer.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::BreakerConfig;

/// Health state of the generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow unrestricted.
    Closed,
    /// Calls are denied until the reset timeout elapses.
    Open,
    /// Exactly one trial call is in flight; its outcome decides the next
    /// state.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Set while the single half-open probe is outstanding.
    probe_in_flight: bool,
}

/// Process-wide circuit breaker for the language-model capability.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            failure_threshold: config.failure_threshold,
            reset_timeout: config.reset_timeout,
        }
    }

    /// Whether a call to the backend may be attempted right now.
    ///
    /// The only method that can move OPEN to HALF_OPEN. In HALF_OPEN at most
    /// one caller gets `true` per cooldown; everyone else is denied until
    /// the probe's outcome is reported.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "Circuit breaker half-open, permitting trial call");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Report a successful backend call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::HalfOpen => {
                tracing::info!("Circuit breaker closing after successful trial call");
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.probe_in_flight = false;
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Report a completed call that failed for a non-backend reason, such as
    /// a client-side request error or unusable output.
    ///
    /// The backend answered, so a half-open probe resolves the same way a
    /// success would. The consecutive-failure count is left alone: content
    /// errors never count toward tripping the circuit.
    pub fn record_content_error(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        if inner.state == CircuitState::HalfOpen {
            tracing::info!("Circuit breaker closing, trial call reached the backend");
            inner.state = CircuitState::Closed;
            inner.consecutive_failures = 0;
            inner.opened_at = None;
            inner.probe_in_flight = false;
        }
    }

    /// Report a transient backend failure.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::HalfOpen => {
                tracing::warn!("Circuit breaker reopening after failed trial call");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    tracing::warn!(
                        failures = inner.consecutive_failures,
                        "Circuit breaker opening"
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            // Stragglers from calls admitted before the trip must not keep
            // extending the cooldown.
            CircuitState::Open => {}
        }
    }

    /// Current state, for observability.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("breaker lock poisoned").state
    }
}
