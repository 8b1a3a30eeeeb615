//! Retry backoff policy

use std::time::Duration;

/// Exponential backoff between consecutive failed beats
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Multiplier applied per consecutive failure
    pub backoff_coefficient: f64,
    /// Upper bound on any single delay
    pub maximum_interval: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(1000),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_millis(30_000),
        }
    }
}

impl BackoffPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    pub fn with_maximum_interval(mut self, interval: Duration) -> Self {
        self.maximum_interval = interval;
        self
    }

    /// Delay before retry number `attempt`, counted from zero
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_coefficient.max(1.0).powi(attempt.min(64) as i32);
        let millis = self.initial_interval.as_millis() as f64 * factor;
        let capped = millis.min(self.maximum_interval.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}
