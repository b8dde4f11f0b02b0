use crate::error::ErrorCategory;
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Maximum jitter as percentage of delay
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.1, // 10% jitter
        }
    }
}

impl RetryConfig {
    /// Transient-failure config with the given attempt budget
    #[must_use]
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Create config for rate limited retries
    #[must_use]
    pub const fn rate_limited(initial_delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(300), // 5 minutes
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    /// Single attempt, never retried
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }
}

/// Retry policy that determines retry behavior based on error
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    transient_config: RetryConfig,
    rate_limited_config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            transient_config: RetryConfig::default(),
            rate_limited_config: RetryConfig::rate_limited(Duration::from_secs(5), 6),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(transient_config: RetryConfig, rate_limited_config: RetryConfig) -> Self {
        Self {
            transient_config,
            rate_limited_config,
        }
    }

    /// Policy that tries every request exactly once
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            transient_config: RetryConfig::no_retry(),
            rate_limited_config: RetryConfig::no_retry(),
        }
    }

    /// Get retry config based on error
    #[must_use]
    pub fn config_for_error(&self, error: &Error) -> Option<&RetryConfig> {
        match error.category() {
            ErrorCategory::Permanent => None,
            ErrorCategory::RateLimited => Some(&self.rate_limited_config),
            ErrorCategory::Transient => Some(&self.transient_config),
        }
    }
}

/// Execute an operation with retry logic
pub async fn retry_with_policy<T, F, Fut>(
    operation: F,
    policy: &RetryPolicy,
    operation_name: &str,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        debug!(
            "Executing operation '{}' (attempt {})",
            operation_name, attempt
        );

        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        "Operation '{}' succeeded after {} attempts",
                        operation_name, attempt
                    );
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        let Some(retry_config) = policy.config_for_error(&error) else {
            debug!(
                "Operation '{}' failed with non-retryable error: {}",
                operation_name, error
            );
            return Err(error);
        };

        if attempt >= retry_config.max_attempts {
            warn!(
                "Operation '{}' failed after {} attempts: {}",
                operation_name, attempt, error
            );
            return Err(error);
        }

        let delay = calculate_delay(attempt - 1, retry_config, &error);

        warn!(
            "Operation '{}' failed (attempt {}), retrying after {:?}: {}",
            operation_name, attempt, delay, error
        );

        sleep(delay).await;
        attempt += 1;
    }
}

/// Calculate delay for retry attempt
fn calculate_delay(attempt: u32, config: &RetryConfig, error: &Error) -> Duration {
    let exponential = backoff_delay(attempt, config);

    // A server-provided Retry-After is a floor, never a reason to wait less
    match error.retry_after() {
        Some(retry_after) => exponential.max(retry_after.min(config.max_delay)),
        None => exponential,
    }
}

fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay_ms = config.initial_delay.as_millis() as f64;
    let exponential_delay_ms = base_delay_ms * config.multiplier.powi(attempt as i32);
    let capped_delay_ms = exponential_delay_ms.min(config.max_delay.as_millis() as f64);
    let delay = Duration::from_millis(capped_delay_ms as u64);

    add_jitter(delay, config.jitter)
}

/// Add jitter to delay
fn add_jitter(delay: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 {
        return delay;
    }

    use rand::Rng;
    let mut rng = rand::thread_rng();
    let jitter_ms = (delay.as_millis() as f64 * jitter_factor) as u64;
    let jitter = rng.gen_range(0..=jitter_ms);

    delay + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let result = retry_with_policy(
            || async { Ok::<u32, Error>(42) },
            &RetryPolicy::default(),
            "test_operation",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(
            move || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(Error::ServiceUnavailable {
                            service: "test".to_string(),
                            reason: "temporary failure".to_string(),
                        })
                    } else {
                        Ok(42u32)
                    }
                }
            },
            &RetryPolicy::new(fast(4), fast(4)),
            "test_operation",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_permanent_error_no_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move { Err::<u32, Error>(Error::AuthenticationFailed("401".to_string())) }
            },
            &RetryPolicy::default(),
            "test_operation",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_budget_is_bounded() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let policy = RetryPolicy::new(fast(4), fast(3));

        let result = retry_with_policy(
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err::<u32, Error>(Error::RateLimitExceeded {
                        retry_after: Duration::from_millis(1),
                    })
                }
            },
            &policy,
            "test_operation",
        )
        .await;

        assert!(matches!(result, Err(Error::RateLimitExceeded { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_policy_tries_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_with_policy(
            move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    Err::<u32, Error>(Error::ServiceUnavailable {
                        service: "test".to_string(),
                        reason: "down".to_string(),
                    })
                }
            },
            &RetryPolicy::no_retry(),
            "test_operation",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jitter_calculation() {
        let delay = Duration::from_millis(1000);
        let jittered = add_jitter(delay, 0.1);

        assert!(jittered >= delay);
        assert!(jittered <= delay + Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let config = RetryConfig {
            jitter: 0.0,
            ..RetryConfig::rate_limited(Duration::from_secs(5), 6)
        };
        assert_eq!(backoff_delay(0, &config), Duration::from_secs(5));
        assert_eq!(backoff_delay(1, &config), Duration::from_secs(10));
        assert_eq!(backoff_delay(2, &config), Duration::from_secs(20));
        assert_eq!(backoff_delay(10, &config), Duration::from_secs(300));
    }

    #[test]
    fn test_error_categorization() {
        let policy = RetryPolicy::default();

        let permanent_error = Error::InvalidInput {
            field: "test".to_string(),
            reason: "invalid".to_string(),
        };
        assert!(policy.config_for_error(&permanent_error).is_none());

        let transient_error = Error::ServiceUnavailable {
            service: "test".to_string(),
            reason: "temporary".to_string(),
        };
        assert!(policy.config_for_error(&transient_error).is_some());

        let rate_limited_error = Error::RateLimitExceeded {
            retry_after: Duration::from_secs(60),
        };
        let config = policy.config_for_error(&rate_limited_error).unwrap();
        assert_eq!(config.max_delay, Duration::from_secs(300));
    }
}
