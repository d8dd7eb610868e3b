//! Exponential backoff for failed tray renders.

use std::time::Duration;

/// Backoff schedule for re-rendering after a failure.
///
/// A render target gets `max_attempts` attempts in total. A newer transition
/// starts over with a fresh budget.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent failure.
    pub backoff_factor: f64,
    /// Attempts per target, including the first (at least one).
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            max_attempts: 8,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after `failures` consecutive failed attempts (1-based).
    pub fn delay_for_attempt(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }

    /// Whether `attempts` used up the budget for one target.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts.max(1)
    }
}
