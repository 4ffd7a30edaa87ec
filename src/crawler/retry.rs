//! Bounded retry around a `Fetcher`

use crate::config::HttpConfig;
use crate::crawler::fetcher::{FetchError, Fetcher};
use std::time::Duration;

/// Up to `max_attempts` tries with a fixed pause between them
///
/// There is no backoff growth and no pause after the final attempt. Permanent
/// failures (see [`FetchError::is_transient`]) end the loop immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_delay())
    }

    /// Fetches `url`, retrying transient failures
    ///
    /// Returns the body of the first successful attempt, or the error of the
    /// last attempt made.
    pub async fn fetch<F: Fetcher + ?Sized>(
        &self,
        fetcher: &F,
        url: &str,
    ) -> Result<String, FetchError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match fetcher.fetch(url).await {
                Ok(body) => {
                    if attempt > 1 {
                        tracing::debug!("Fetched {} on attempt {}/{}", url, attempt, attempts);
                    }
                    return Ok(body);
                }
                Err(error) if attempt < attempts && error.is_transient() => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        attempts,
                        url,
                        error,
                        self.delay
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
                Err(error) => {
                    tracing::warn!("Failed after {} attempt(s): {}", attempt, error);
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::test_support::ScriptedFetcher;

    #[tokio::test]
    async fn test_always_failing_fetcher_gets_exactly_k_attempts() {
        for k in 1..=4 {
            let fetcher = ScriptedFetcher::new().network_error("http://x/a");
            let policy = RetryPolicy::new(k, Duration::ZERO);

            let result = policy.fetch(&fetcher, "http://x/a").await;

            assert!(matches!(result, Err(FetchError::Network { .. })));
            assert_eq!(fetcher.calls("http://x/a"), k as usize);
        }
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let fetcher = ScriptedFetcher::new().sequence(
            "http://x/a",
            vec![
                Err(FetchError::Timeout {
                    url: "http://x/a".to_string(),
                }),
                Err(FetchError::Http {
                    url: "http://x/a".to_string(),
                    status: 502,
                }),
                Ok("<html>ok</html>".to_string()),
            ],
        );
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let body = policy.fetch(&fetcher, "http://x/a").await.unwrap();
        assert_eq!(body, "<html>ok</html>");
        assert_eq!(fetcher.calls("http://x/a"), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let fetcher = ScriptedFetcher::new().http_error("http://x/gone", 404);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result = policy.fetch(&fetcher, "http://x/gone").await;
        assert!(matches!(result, Err(FetchError::Http { status: 404, .. })));
        assert_eq!(fetcher.calls("http://x/gone"), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let fetcher = ScriptedFetcher::new().page("http://x/a", "body");
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert!(policy.fetch(&fetcher, "http://x/a").await.is_ok());
        assert_eq!(fetcher.calls("http://x/a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let fetcher = ScriptedFetcher::new().network_error("http://x/a");
        let policy = RetryPolicy::new(3, Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        let _ = policy.fetch(&fetcher, "http://x/a").await;

        // Two pauses between three attempts, none after the last
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }
}
