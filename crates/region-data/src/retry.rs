//! Retry policies for fetch operations.

use std::time::Duration;

use async_trait::async_trait;
use region_core::RegionData;

use crate::error::FetchError;
use crate::source::DataSource;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff with base and max.
    Exponential {
        /// Initial delay.
        base: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed(d) => *d,
            Self::Exponential { base, max } => {
                let multiplier = 2u32.saturating_pow(attempt);
                base.saturating_mul(multiplier).min(*max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(50),
            max: Duration::from_millis(500),
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first try.
    pub max_attempts: u32,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::default(),
        }
    }

    /// Create a policy with no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            backoff: BackoffStrategy::None,
        }
    }

    /// Set backoff strategy.
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Check if a failed attempt should be retried.
    pub fn should_retry(&self, error: &FetchError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Data source wrapper that retries retryable faults.
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: DataSource> RetryingSource<S> {
    /// Wrap a source with a retry policy.
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Get the retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<S: DataSource> DataSource for RetryingSource<S> {
    async fn fetch(&self, key: &str) -> Result<RegionData, FetchError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(key).await {
                Ok(data) => return Ok(data),
                Err(e) if self.policy.should_retry(&e, attempt) => {
                    let delay = self.policy.backoff.delay_for_attempt(attempt);
                    tracing::debug!(
                        source = self.inner.name(),
                        key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying fetch"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedSource;
    use serde_json::json;

    // === Backoff Tests ===

    #[test]
    fn test_exponential_backoff_caps_at_max() {
        let backoff = BackoffStrategy::default();
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(50));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn test_fixed_and_none_backoff() {
        assert_eq!(
            BackoffStrategy::Fixed(Duration::from_millis(7)).delay_for_attempt(3),
            Duration::from_millis(7)
        );
        assert_eq!(BackoffStrategy::None.delay_for_attempt(3), Duration::ZERO);
    }

    #[test]
    fn test_should_retry_respects_budget_and_kind() {
        let policy = RetryPolicy::new(2);
        let transient = FetchError::Unavailable("503".into());
        assert!(policy.should_retry(&transient, 0));
        assert!(policy.should_retry(&transient, 1));
        assert!(!policy.should_retry(&transient, 2));
        assert!(!policy.should_retry(&FetchError::NotFound("x".into()), 0));
        assert!(!RetryPolicy::none().should_retry(&transient, 0));
    }

    // === RetryingSource Tests ===

    #[tokio::test(start_paused = true)]
    async fn test_retrying_source_recovers_from_transient_failures() {
        let inner = SimulatedSource::new("flaky", json!("ok")).with_fail_first(2);
        let counter = inner.counter();
        let source = RetryingSource::new(inner, RetryPolicy::new(3));

        let data = source.fetch("k").await.unwrap();
        assert_eq!(data, json!("ok"));
        assert_eq!(counter.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrying_source_gives_up() {
        let inner = SimulatedSource::new("down", json!(null)).failing("offline");
        let counter = inner.counter();
        let source = RetryingSource::new(inner, RetryPolicy::new(1));

        let err = source.fetch("k").await.unwrap_err();
        assert_eq!(err, FetchError::Unavailable("offline".into()));
        assert_eq!(counter.get(), 2);
    }
}
