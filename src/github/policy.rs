use crate::cancel::CancelToken;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Granularity at which a sleep notices cancellation.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Retry, backoff and rate-limit waiting for the API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound on a single rate-limit pause.
    pub max_rate_limit_wait: Duration,
    /// Consecutive rate-limit pauses tolerated for one request.
    /// Independent of `max_retries`.
    pub max_rate_limit_pauses: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            max_rate_limit_wait: Duration::from_secs(60 * 60),
            max_rate_limit_pauses: 10,
        }
    }
}

impl RetryPolicy {
    /// No waiting at all; for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_rate_limit_wait: Duration::ZERO,
            max_rate_limit_pauses: 10,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `attempt` (0-based): base * 2^attempt, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// How long to wait for a quota reset at `reset_at`, or `None` if it has passed.
    pub fn rate_limit_wait(&self, now: DateTime<Utc>, reset_at: DateTime<Utc>) -> Option<Duration> {
        let wait = (reset_at - now).to_std().ok()?;
        if wait.is_zero() {
            return None;
        }
        Some(wait.min(self.max_rate_limit_wait))
    }
}

/// Source of time for waits, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    /// Sleep for `duration`, returning `Cancelled` as soon as `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            cancel.check()?;
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(());
            }
            std::thread::sleep(left.min(SLEEP_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            max_rate_limit_wait: Duration::from_secs(10),
            max_rate_limit_pauses: 1,
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn rate_limit_wait_is_clamped_and_skips_past_resets() {
        let policy = RetryPolicy::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let soon = now + chrono::Duration::seconds(90);
        let far = now + chrono::Duration::hours(5);
        assert_eq!(policy.rate_limit_wait(now, soon), Some(Duration::from_secs(90)));
        assert_eq!(policy.rate_limit_wait(now, far), Some(policy.max_rate_limit_wait));
        assert_eq!(policy.rate_limit_wait(soon, now), None);
    }

    #[test]
    fn system_sleep_returns_promptly_when_cancelled() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            trigger.cancel();
        });

        let started = Instant::now();
        let result = SystemClock.sleep(Duration::from_secs(30), &cancel);
        handle.join().unwrap();

        assert!(matches!(result, Err(crate::error::StatsError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn system_sleep_completes_without_cancellation() {
        let started = Instant::now();
        SystemClock
            .sleep(Duration::from_millis(20), &CancelToken::new())
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
