//! Bounded retry with exponential backoff around any [`Fetcher`].
//!
//! Each URL gets at most `max_attempts` tries. Client errors other than 429
//! fail immediately; everything else is retried after a growing delay.

use crate::app::ports::Fetcher;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;
use tracing::warn;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total tries per URL, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Next backoff delay, clamped to `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }
}

pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            counter!("museum_etl_fetch_attempts_total").increment(1);

            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = self.policy.next_delay(delay);
                }
                Err(e) => {
                    counter!("museum_etl_fetch_failures_total").increment(1);
                    return Err(EtlError::Fetch {
                        url: url.to_string(),
                        message: format!("gave up after {attempt} attempt(s): {e}"),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyFetcher {
        failures_before_success: u32,
        calls: AtomicU32,
        retryable: bool,
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures_before_success {
                if self.retryable {
                    return Err(EtlError::Fetch {
                        url: url.to_string(),
                        message: "connection reset".to_string(),
                    });
                }
                return Err(EtlError::NoMatchingTable("not a fetch error".to_string()));
            }
            Ok(format!("<html>{url}</html>"))
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    fn flaky(failures_before_success: u32, retryable: bool) -> FlakyFetcher {
        FlakyFetcher {
            failures_before_success,
            calls: AtomicU32::new(0),
            retryable,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let fetcher = RetryingFetcher::new(flaky(2, true), quick_policy(3));
        let body = fetcher.fetch("https://example.org/a").await.unwrap();
        assert_eq!(body, "<html>https://example.org/a</html>");
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let fetcher = RetryingFetcher::new(flaky(10, true), quick_policy(4));
        let err = fetcher.fetch("https://example.org/b").await.unwrap_err();
        assert!(matches!(err, EtlError::Fetch { ref url, .. } if url == "https://example.org/b"));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let fetcher = RetryingFetcher::new(flaky(1, false), quick_policy(5));
        assert!(fetcher.fetch("https://example.org/c").await.is_err());
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_next_delay_is_clamped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(1),
            multiplier: 3.0,
        };
        assert_eq!(policy.next_delay(Duration::from_millis(200)), Duration::from_millis(600));
        assert_eq!(policy.next_delay(Duration::from_millis(600)), Duration::from_secs(1));
    }
}
