//! Retry with backoff for transient sink failures

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff strategy for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

/// How often and how patiently to retry a retryable operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_retries` and default backoff
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Set backoff configuration
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self
                .initial_backoff
                .checked_mul(attempt.saturating_add(1))
                .unwrap_or(self.max_backoff),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_backoff
                    .checked_mul(factor)
                    .unwrap_or(self.max_backoff)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }

    /// Run `op`, retrying while it fails with a retryable error
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.calculate_backoff(attempt);
                    warn!(
                        "{what} failed: {e}, attempt {}/{}, retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_calculate_backoff() {
        let policy = RetryPolicy::new(5).with_backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(500),
        );
        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(400));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(500));

        let linear = policy.clone().with_backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(1),
        );
        assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));
    }

    #[test]
    fn test_calculate_backoff_saturates_at_max() {
        let max = Duration::from_secs(3600);
        let policy = RetryPolicy::new(100).with_backoff(
            BackoffType::Exponential,
            Duration::from_secs(u64::MAX / 2),
            max,
        );
        assert_eq!(policy.calculate_backoff(40), max);
        assert_eq!(policy.calculate_backoff(u32::MAX), max);

        let linear = policy.with_backoff(BackoffType::Linear, Duration::from_secs(u64::MAX / 2), max);
        assert_eq!(linear.calculate_backoff(u32::MAX), max);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast(3)
            .run("put", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::sink_unavailable("503"))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast(2)
            .run("put", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::sink_unavailable("503"))
            })
            .await;
        assert!(matches!(result, Err(Error::SinkUnavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast(5)
            .run("put", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::sink_rejected("403"))
            })
            .await;
        assert!(matches!(result, Err(Error::SinkRejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
