//! Consecutive network-failure circuit breaker.
//!
//! A worker stops connecting out to its host once `threshold` connect attempts
//! in a row have failed.  Only a successful connection closes the breaker
//! again; elapsed time does not.  Since an open breaker means no further
//! connects are made, in practice it stays open until the worker retires.

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    consecutive_failures: u32,
    trip_reported: bool,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: 0,
            trip_reported: false,
        }
    }

    /// Whether outbound attempts are currently suspended.
    pub fn is_open(&self) -> bool {
        self.consecutive_failures >= self.threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.trip_reported = false;
    }

    /// Called for every skipped attempt.  Returns `true` exactly once per trip,
    /// so the caller logs the trip without flooding on later skips.
    pub fn note_skip(&mut self) -> bool {
        if self.trip_reported {
            false
        } else {
            self.trip_reported = true;
            true
        }
    }
}
