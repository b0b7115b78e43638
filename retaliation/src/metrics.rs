//! Counters describing what the dispatcher and its workers have done.
//!
//! Shared as `Arc<RetaliationMetrics>` between the coordinator and every host
//! worker.  Backpressure drops are only ever counted here, never logged.

use std::{
    fmt,
    sync::atomic::{AtomicI64, AtomicU64, Ordering},
};

// ---------------------------------------------------------------------------
// Metric primitives
// ---------------------------------------------------------------------------

/// A monotonically increasing counter.
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
    name: &'static str,
}

impl Counter {
    pub const fn new(name: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            name,
        }
    }

    /// Increment the counter by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current counter value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A gauge that can go up or down.
#[derive(Debug)]
pub struct Gauge {
    value: AtomicI64,
    name: &'static str,
}

impl Gauge {
    pub const fn new(name: &'static str) -> Self {
        Self {
            value: AtomicI64::new(0),
            name,
        }
    }

    /// Set the gauge to an absolute value.
    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

// ---------------------------------------------------------------------------
// Retaliation metrics
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RetaliationMetrics {
    // -- Dispatch cache --
    pub workers_spawned: Counter,
    pub workers_removed: Counter,
    pub active_workers: Gauge,
    pub credentials_accepted: Counter,
    pub credentials_dropped: Counter,

    // -- Host workers --
    pub connect_failures: Counter,
    pub login_failures: Counter,
    pub login_successes: Counter,
    pub attempts_skipped: Counter,
    pub breaker_trips: Counter,
}

impl Default for RetaliationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RetaliationMetrics {
    pub const fn new() -> Self {
        Self {
            workers_spawned: Counter::new("atsshd_workers_spawned_total"),
            workers_removed: Counter::new("atsshd_workers_removed_total"),
            active_workers: Gauge::new("atsshd_active_workers"),
            credentials_accepted: Counter::new("atsshd_credentials_accepted_total"),
            credentials_dropped: Counter::new("atsshd_credentials_dropped_total"),
            connect_failures: Counter::new("atsshd_connect_failures_total"),
            login_failures: Counter::new("atsshd_login_failures_total"),
            login_successes: Counter::new("atsshd_login_successes_total"),
            attempts_skipped: Counter::new("atsshd_attempts_skipped_total"),
            breaker_trips: Counter::new("atsshd_breaker_trips_total"),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            workers_spawned: self.workers_spawned.get(),
            workers_removed: self.workers_removed.get(),
            active_workers: self.active_workers.get(),
            credentials_accepted: self.credentials_accepted.get(),
            credentials_dropped: self.credentials_dropped.get(),
            connect_failures: self.connect_failures.get(),
            login_failures: self.login_failures.get(),
            login_successes: self.login_successes.get(),
            attempts_skipped: self.attempts_skipped.get(),
            breaker_trips: self.breaker_trips.get(),
        }
    }
}

/// Point-in-time copy of [`RetaliationMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub workers_spawned: u64,
    pub workers_removed: u64,
    pub active_workers: i64,
    pub credentials_accepted: u64,
    pub credentials_dropped: u64,
    pub connect_failures: u64,
    pub login_failures: u64,
    pub login_successes: u64,
    pub attempts_skipped: u64,
    pub breaker_trips: u64,
}

impl MetricsSnapshot {
    /// Attempts that reached a terminal outcome, skipped ones included.
    pub fn attempts_finished(&self) -> u64 {
        self.connect_failures
            .saturating_add(self.login_failures)
            .saturating_add(self.login_successes)
            .saturating_add(self.attempts_skipped)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workers spawned={} removed={} active={}; credentials accepted={} dropped={}; \
             attempts connect_failed={} login_failed={} succeeded={} skipped={}; breaker trips={}",
            self.workers_spawned,
            self.workers_removed,
            self.active_workers,
            self.credentials_accepted,
            self.credentials_dropped,
            self.connect_failures,
            self.login_failures,
            self.login_successes,
            self.attempts_skipped,
            self.breaker_trips,
        )
    }
}
