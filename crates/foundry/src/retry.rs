use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::errors::{FoundryError, FoundryResult};

/// Bounded exponential backoff for rate limits and service errors
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts after the first one. Zero disables retries.
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub backoff_multiplier: f64,
    /// Upper bound for any single wait, including a server-requested one
    pub max_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_interval.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let delay = Duration::from_millis(millis.min(u64::MAX as f64) as u64);
        delay.min(self.max_interval)
    }

    fn delay_for(&self, err: &FoundryError, attempt: u32) -> Duration {
        match err {
            FoundryError::RateLimit {
                retry_after: Some(after),
                ..
            } => (*after).min(self.max_interval),
            _ => self.delay_for_attempt(attempt),
        }
    }
}

/// Run `operation`, retrying retryable failures according to `config`.
///
/// Terminal errors and the error of the last allowed attempt are returned unchanged.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> FoundryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FoundryResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                let delay = config.delay_for(&err, attempt);
                warn!(
                    "{}, retrying in {:?} (attempt {}/{})",
                    err, delay, attempt, config.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_interval: Duration::from_millis(1),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_delay_grows_and_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(10));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let config = fast();
        let err = FoundryError::RateLimit {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(config.delay_for(&err, 1), Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast(), move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(FoundryError::RateLimit {
                    message: "busy".into(),
                    retry_after: None,
                })
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: FoundryResult<()> = with_retry(&fast(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(FoundryError::Service {
                status: Some(503),
                message: "down".into(),
            })
        })
        .await;

        assert!(matches!(result, Err(FoundryError::Service { status: Some(503), .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: FoundryResult<()> = with_retry(&fast(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(FoundryError::Authentication("expired".into()))
        })
        .await;

        assert!(matches!(result, Err(FoundryError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
