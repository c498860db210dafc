//! Retry with exponential backoff for catalog API calls.
//!
//! Only transient failures are retried; a 4xx other than 429 fails the
//! operation immediately.

use std::time::Duration;

use tracing::debug;

use crate::error::CatalogError;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all; useful in tests.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Retry executor with exponential backoff.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.config.max_delay.as_millis() as f64);

        let with_jitter = if self.config.jitter {
            // Up to 25% jitter so synchronised workers fan out.
            capped * (1.0 + rand_simple() * 0.25)
        } else {
            capped
        };

        Duration::from_millis(with_jitter as u64)
    }

    /// Execute an operation, retrying transient failures.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CatalogError>>,
    {
        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_transient() || attempt == self.config.max_retries {
                        return Err(e);
                    }

                    let delay = self.delay(attempt);
                    debug!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying after transient catalog error"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop always returns")
    }
}

/// Cheap pseudo-random source for jitter; not cryptographic.
fn rand_simple() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64,
    );
    (hasher.finish() as f64) / (u64::MAX as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let executor = RetryExecutor::new(fast_config(3));
        let attempts = AtomicU32::new(0);

        let result = executor
            .execute(|| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(CatalogError::Timeout)
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_immediately() {
        let executor = RetryExecutor::new(fast_config(5));
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(CatalogError::Api {
                        status: 422,
                        message: "bad entry".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_error() {
        let executor = RetryExecutor::new(fast_config(2));
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(CatalogError::RateLimited) }
            })
            .await;

        assert!(matches!(result, Err(CatalogError::RateLimited)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
