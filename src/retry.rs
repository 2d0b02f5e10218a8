//! Retry backoff policy
//!
//! Delays grow exponentially: `base * 2^(attempt - 1)`, so with a 2000ms
//! base the waits after attempts 1, 2, 3 are 2000, 4000, 8000ms. Sleeping is
//! behind the [`Sleeper`] trait so tests can record delays instead of
//! waiting them out.

use crate::config::InstallOptions;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after the failed `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// True if another attempt is allowed after `attempt`
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl From<&InstallOptions> for RetryPolicy {
    fn from(options: &InstallOptions) -> Self {
        Self::new(
            options.max_retries,
            Duration::from_millis(options.retry_delay_ms),
        )
    }
}

/// Blocks the current package for a backoff delay
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real sleeping via `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested delays without sleeping
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::new(3, Duration::from_millis(2000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_should_retry_stops_at_max() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert!(policy.delay_after(90) >= policy.delay_after(31));
    }

    #[test]
    fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_millis(5));
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(5)]);
    }
}
