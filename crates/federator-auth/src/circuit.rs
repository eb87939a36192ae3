//! A small circuit breaker guarding outbound IDP calls: token fetch and
//! verification are both wrapped in a retry + circuit-breaker policy,
//! and a circuit left open surfaces as [`crate::error::AuthError::CircuitOpen`].
//!
//! Kept intentionally small: closed -> open on N consecutive
//! failures, open -> half-open after a cooldown, half-open -> closed
//! on the next success or back to open on the next failure.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

pub struct CircuitBreaker {
    state: Mutex<Inner>,
    failure_threshold: u32,
    open_cooldown: Duration,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_cooldown: Duration) -> Self {
        CircuitBreaker {
            state: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
            failure_threshold,
            open_cooldown,
        }
    }

    /// Returns `true` when a call should be attempted (the circuit is
    /// closed, or half-open after the cooldown elapsed).
    pub fn allow_request(&self) -> bool {
        let mut inner = self.state.lock().unwrap();
        match inner.state {
            State::Closed => true,
            State::HalfOpen => true,
            State::Open => {
                if inner.opened_at.map_or(false, |at| at.elapsed() >= self.open_cooldown) {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.state.lock().unwrap();
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.state.lock().unwrap();
        inner.consecutive_failures += 1;
        if inner.state == State::HalfOpen || inner.consecutive_failures >= self.failure_threshold {
            inner.state = State::Open;
            inner.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(cb.allow_request());
        cb.record_failure();
        cb.record_failure();
        assert!(cb.allow_request());
        cb.record_failure();
        assert!(!cb.allow_request());
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10));
        cb.record_failure();
        assert!(!cb.allow_request());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow_request()); // half-open
        cb.record_failure();
        assert!(!cb.allow_request());
    }

    #[test]
    fn success_resets_to_closed() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(10));
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.allow_request());
        cb.record_success();
        cb.record_failure();
        assert!(cb.allow_request());
    }
}
