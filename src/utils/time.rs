// src/utils/time.rs
//! Injectable clocks
//!
//! Session logic asks a [`TimeProvider`] for the time instead of reading the
//! system clock, so recording deadlines and rehab timers run against a
//! [`MockTimeProvider`] in tests without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;

    fn now_micros(&self) -> u64 {
        self.now_nanos() / 1000
    }
}

/// Monotonic time since the provider was created
pub struct MonotonicTimeProvider {
    origin: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Mock time provider for deterministic testing
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn advance(&self, duration: Duration) {
        self.advance_by(duration.as_nanos() as u64);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }
}

/// Wall-clock budget measured against a [`TimeProvider`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start_nanos: u64,
    budget_nanos: u64,
}

impl Deadline {
    /// Start a budget of `budget` at the provider's current time
    pub fn start(clock: &dyn TimeProvider, budget: Duration) -> Self {
        Self {
            start_nanos: clock.now_nanos(),
            budget_nanos: budget.as_nanos() as u64,
        }
    }

    pub fn elapsed_s(&self, clock: &dyn TimeProvider) -> f64 {
        nanos_to_seconds(clock.now_nanos().saturating_sub(self.start_nanos))
    }

    pub fn is_expired(&self, clock: &dyn TimeProvider) -> bool {
        clock.now_nanos().saturating_sub(self.start_nanos) >= self.budget_nanos
    }

    pub fn budget(&self) -> Duration {
        Duration::from_nanos(self.budget_nanos)
    }
}

pub fn nanos_to_seconds(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_SECOND
}

/// Convert fractional seconds, clamping negative and non-finite input to zero
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}
