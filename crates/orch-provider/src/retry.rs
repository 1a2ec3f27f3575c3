//! Retry logic with exponential backoff
//!
//! Wraps a provider call in a retry loop that only re-attempts transient
//! failures. Fatal errors (auth, malformed requests) are returned on the
//! first occurrence.

use crate::error::{ProviderError, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts (first try included)
    pub max_retries: u32,

    /// Base backoff; attempt `n` sleeps `retry_delay * 2^n` before retrying
    pub retry_delay: Duration,

    /// Cap on a single backoff sleep
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_retries: u32, retry_delay: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            max_backoff,
        }
    }

    /// Create a policy with fast backoff (for tests)
    pub fn fast() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
        }
    }

    /// Backoff slept after failed attempt `attempt` (0-indexed)
    fn backoff_duration(&self, attempt: u32) -> Duration {
        let backoff = self
            .retry_delay
            .saturating_mul(2_u32.saturating_pow(attempt));
        backoff.min(self.max_backoff)
    }

    /// Execute an async operation with retry on transient failures
    ///
    /// Returns the first success, the first fatal error, or the last
    /// transient error once all attempts are spent.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            debug!(
                "attempt {}/{} for {}",
                attempt + 1,
                self.max_retries,
                operation_name
            );

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("{} succeeded after {} retries", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(e) if e.is_fatal() => {
                    debug!("{} failed with non-retryable error: {}", operation_name, e);
                    return Err(e);
                }
                Err(e) => {
                    last_error = Some(e);

                    if attempt + 1 < self.max_retries {
                        let backoff = self.backoff_duration(attempt);
                        warn!(
                            "{} failed (attempt {}/{}): {:?}, retrying in {:?}",
                            operation_name,
                            attempt + 1,
                            self.max_retries,
                            last_error,
                            backoff
                        );
                        sleep(backoff).await;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| {
            ProviderError::Configuration("retry loop ran zero attempts".to_string())
        });

        warn!(
            "{} failed after {} attempts: {}",
            operation_name, self.max_retries, error
        );

        Err(error)
    }
}
