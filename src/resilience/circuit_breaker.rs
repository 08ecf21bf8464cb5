//! Three-state circuit breaker per adapter, modeled on the endpoint-rotator
//! failure accounting pattern: count consecutive failures, trip open for a
//! cooldown, then allow a single half-open probe.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

const FAILURE_THRESHOLD: u32 = 5;
const COOLDOWN: Duration = Duration::from_secs(60);

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    /// One probe request in flight while half-open.
    half_open_probe_active: bool,
}

/// Tracks a single adapter's circuit. Cheap to clone via `Arc` at the call
/// site; the struct itself holds its own lock.
pub struct CircuitBreaker {
    adapter: String,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(adapter: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
                half_open_probe_active: false,
            }),
        }
    }

    /// Whether a request may proceed right now. Transitions Open → HalfOpen
    /// as a side effect once the cooldown has elapsed.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if inner.half_open_probe_active {
                    false
                } else {
                    inner.half_open_probe_active = true;
                    true
                }
            }
            CircuitState::Open => {
                let elapsed = inner.last_failure.map(|t| t.elapsed()).unwrap_or(Duration::MAX);
                if elapsed > COOLDOWN {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_probe_active = true;
                    info!(adapter = %self.adapter, "circuit breaker entering half-open");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Closed {
            info!(adapter = %self.adapter, "circuit breaker closing after success");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.half_open_probe_active = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.half_open_probe_active = false;
        inner.last_failure = Some(Instant::now());

        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            warn!(adapter = %self.adapter, "circuit breaker re-opening after half-open probe failure");
            return;
        }

        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= FAILURE_THRESHOLD {
            inner.state = CircuitState::Open;
            warn!(adapter = %self.adapter, failures = inner.consecutive_failures, "circuit breaker opening");
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new("test");
        for _ in 0..FAILURE_THRESHOLD {
            assert!(cb.allow_request());
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
    }

    #[test]
    fn closes_on_success_from_closed() {
        let cb = CircuitBreaker::new("test");
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 0);
    }

    #[test]
    fn half_open_allows_single_probe() {
        let cb = CircuitBreaker::new("test");
        for _ in 0..FAILURE_THRESHOLD {
            cb.record_failure();
        }
        {
            let mut inner = cb.inner.lock();
            inner.last_failure = Some(Instant::now() - Duration::from_secs(61));
        }
        assert!(cb.allow_request());
        assert!(!cb.allow_request());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
