//! Retry policy with exponential backoff.
//!
//! The retry system consists of:
//! - [`RetryPolicy`]: configuration (max attempts, backoff settings, which
//!   error classes qualify)
//! - [`ExponentialBackoff`]: yields sleep durations with jitter
//! - [`retry`] and [`retry_with_policy`]: helpers that wrap a whole call in
//!   a retry loop
//!
//! The backoff sequence follows the
//! [gRPC connection backoff specification](https://github.com/grpc/grpc/blob/master/doc/connection-backoff.md):
//! `base * multiplier^attempt`, randomized by a jitter factor, clamped to a
//! maximum delay.
//!
//! # Which errors are retried
//!
//! Only transient failures qualify: network errors and server-side statuses
//! (5xx, 429) — see [`Error::is_retryable`]. Timeouts are retried only when
//! the policy opts in via [`RetryPolicy::retry_on_timeout`]. Cancellation
//! and pipeline defects are never retried.
//!
//! Note that the helpers here re-run the *entire* call they wrap. To retry
//! only the downstream segment of a pipeline from a fixed position, use
//! [`RetryInterceptor`](crate::RetryInterceptor) instead.

use std::future::Future;
use std::time::Duration;

use viaduct_core::Error;

/// Default configuration values, per the gRPC connection backoff spec.
pub mod defaults {
    use std::time::Duration;

    /// Default initial delay before the first retry.
    pub const BASE_DELAY: Duration = Duration::from_secs(1);

    /// Default multiplier for exponential backoff.
    pub const MULTIPLIER: f64 = 1.6;

    /// Default jitter factor (0.2 means +/- 20%).
    pub const JITTER: f64 = 0.2;

    /// Default maximum delay between retries.
    pub const MAX_DELAY: Duration = Duration::from_secs(120);

    /// Default maximum number of retry attempts.
    pub const MAX_RETRIES: u32 = 3;
}

/// Configuration for retry behavior.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use viaduct::RetryPolicy;
///
/// // Defaults: 3 retries, 1s base delay, x1.6, 20% jitter, 120s cap.
/// let policy = RetryPolicy::default();
///
/// // Custom configuration
/// let policy = RetryPolicy::new()
///     .max_retries(5)
///     .base_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30))
///     .retry_on_timeout(true);
/// ```
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Initial delay before the first retry.
    pub base_delay: Duration,

    /// Multiplier for exponential backoff. Must be >= 1.0.
    pub multiplier: f64,

    /// Jitter factor between 0.0 and 1.0. A value of 0.2 keeps the actual
    /// delay within +/- 20% of the calculated delay.
    pub jitter: f64,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,

    /// Whether [`Error::Timeout`] qualifies for retry. Off by default:
    /// retrying a timed-out exchange is an explicit choice, not automatic.
    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: defaults::BASE_DELAY,
            multiplier: defaults::MULTIPLIER,
            jitter: defaults::JITTER,
            max_delay: defaults::MAX_DELAY,
            max_retries: defaults::MAX_RETRIES,
            retry_on_timeout: false,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// A policy for aggressive retrying: 50ms base delay, 1s cap, 5 retries.
    /// Suitable for latency-sensitive calls.
    pub fn aggressive() -> Self {
        Self {
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            max_retries: 5,
            ..Default::default()
        }
    }

    /// A policy for patient retrying: 2s base delay, 5 minute cap,
    /// 10 retries. Suitable for background work.
    pub fn patient() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(300),
            max_retries: 10,
            ..Default::default()
        }
    }

    /// Set the maximum number of retry attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier` is less than 1.0.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier >= 1.0, "multiplier must be >= 1.0");
        self.multiplier = multiplier;
        self
    }

    /// Set the jitter factor.
    ///
    /// # Panics
    ///
    /// Panics if `jitter` is not between 0.0 and 1.0.
    pub fn jitter(mut self, jitter: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&jitter),
            "jitter must be between 0.0 and 1.0"
        );
        self.jitter = jitter;
        self
    }

    /// Opt in (or out) of retrying timed-out exchanges.
    pub fn retry_on_timeout(mut self, retry: bool) -> Self {
        self.retry_on_timeout = retry;
        self
    }

    /// Validate the policy configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.base_delay > self.max_delay {
            return Err("base_delay must not exceed max_delay");
        }
        if self.multiplier < 1.0 {
            return Err("multiplier must be >= 1.0");
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err("jitter must be between 0.0 and 1.0");
        }
        Ok(())
    }

    /// Whether the given error qualifies for another attempt under this
    /// policy. Cancellation and defects never do.
    pub fn should_retry(&self, error: &Error) -> bool {
        match error {
            Error::Canceled | Error::Defect(_) => false,
            Error::Timeout(_) => self.retry_on_timeout,
            other => other.is_retryable(),
        }
    }

    /// Create an [`ExponentialBackoff`] iterator from this policy.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.clone())
    }
}

/// Exponential backoff iterator with jitter.
///
/// # Example
///
/// ```
/// use viaduct::RetryPolicy;
///
/// let policy = RetryPolicy::new().jitter(0.0); // no jitter, predictable
/// let mut backoff = policy.backoff();
///
/// let first = backoff.next_delay();   // base delay
/// let second = backoff.next_delay();  // base * multiplier
/// assert!(second >= first);
/// ```
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    policy: RetryPolicy,
    /// Current delay without jitter, kept as f64 to avoid rounding drift.
    current_delay_secs: f64,
    attempts: u32,
}

impl ExponentialBackoff {
    /// Create a backoff iterator from a policy.
    pub fn new(policy: RetryPolicy) -> Self {
        let current_delay_secs = policy.base_delay.as_secs_f64();
        Self {
            policy,
            current_delay_secs,
            attempts: 0,
        }
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.current_delay_secs = self.policy.base_delay.as_secs_f64();
        self.attempts = 0;
    }

    /// Number of attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether more retries are allowed.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.policy.max_retries
    }

    /// The next delay, with jitter applied; advances the internal state.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay_secs;

        // delay * (1 + jitter * random(-1, 1))
        let jittered = if self.policy.jitter > 0.0 {
            let jitter_range = self.policy.jitter * 2.0;
            let random_factor = rand::random::<f64>() * jitter_range - self.policy.jitter;
            delay * (1.0 + random_factor)
        } else {
            delay
        };

        let clamped = jittered.min(self.policy.max_delay.as_secs_f64());

        self.current_delay_secs = (self.current_delay_secs * self.policy.multiplier)
            .min(self.policy.max_delay.as_secs_f64());
        self.attempts += 1;

        Duration::from_secs_f64(clamped.max(0.0))
    }
}

/// Retry a fallible async operation with the default policy.
///
/// # Example
///
/// ```ignore
/// use viaduct::retry;
///
/// let response = retry(|| async {
///     pipeline.send(request.clone()).await
/// }).await?;
/// ```
pub async fn retry<F, Fut, T>(f: F) -> Result<T, Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    retry_with_policy(&RetryPolicy::default(), f).await
}

/// Retry a fallible async operation with a custom policy.
///
/// Only errors that [`RetryPolicy::should_retry`] accepts are retried;
/// anything else is returned immediately.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use viaduct::{RetryPolicy, retry_with_policy};
///
/// let policy = RetryPolicy::new()
///     .max_retries(5)
///     .base_delay(Duration::from_millis(100));
///
/// let response = retry_with_policy(&policy, || async {
///     pipeline.send(request.clone()).await
/// }).await?;
/// ```
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, f: F) -> Result<T, Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    if let Err(msg) = policy.validate() {
        return Err(Error::InvalidRequest(format!("invalid retry policy: {msg}")));
    }

    let mut backoff = policy.backoff();

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if policy.should_retry(&e) && backoff.can_retry() => {
                let delay = backoff.next_delay();
                tracing::debug!(
                    error = %e,
                    attempt = backoff.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    fn unavailable() -> Error {
        Error::HttpStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: None,
        }
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert!((policy.multiplier - 1.6).abs() < f64::EPSILON);
        assert!((policy.jitter - 0.2).abs() < f64::EPSILON);
        assert_eq!(policy.max_delay, Duration::from_secs(120));
        assert_eq!(policy.max_retries, 3);
        assert!(!policy.retry_on_timeout);
    }

    #[test]
    fn test_policy_presets() {
        assert_eq!(RetryPolicy::no_retry().max_retries, 0);

        let aggressive = RetryPolicy::aggressive();
        assert_eq!(aggressive.base_delay, Duration::from_millis(50));
        assert_eq!(aggressive.max_delay, Duration::from_secs(1));
        assert_eq!(aggressive.max_retries, 5);

        let patient = RetryPolicy::patient();
        assert_eq!(patient.base_delay, Duration::from_secs(2));
        assert_eq!(patient.max_delay, Duration::from_secs(300));
        assert_eq!(patient.max_retries, 10);
    }

    #[test]
    fn test_policy_validate() {
        assert!(RetryPolicy::default().validate().is_ok());

        let invalid = RetryPolicy {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    #[should_panic(expected = "multiplier must be >= 1.0")]
    fn test_policy_invalid_multiplier() {
        RetryPolicy::new().multiplier(0.5);
    }

    #[test]
    #[should_panic(expected = "jitter must be between 0.0 and 1.0")]
    fn test_policy_invalid_jitter() {
        RetryPolicy::new().jitter(1.5);
    }

    #[test]
    fn test_should_retry_classification() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&Error::Network("reset".into())));
        assert!(policy.should_retry(&unavailable()));
        assert!(!policy.should_retry(&Error::Timeout(Duration::from_secs(1))));
        assert!(!policy.should_retry(&Error::Canceled));
        assert!(!policy.should_retry(&Error::Defect("bug".into())));

        let with_timeouts = RetryPolicy::new().retry_on_timeout(true);
        assert!(with_timeouts.should_retry(&Error::Timeout(Duration::from_secs(1))));
        assert!(!with_timeouts.should_retry(&Error::Canceled));
    }

    #[test]
    fn test_backoff_no_jitter() {
        let policy = RetryPolicy::new()
            .base_delay(Duration::from_secs(1))
            .multiplier(2.0)
            .max_delay(Duration::from_secs(100))
            .jitter(0.0);

        let mut backoff = policy.backoff();
        assert_eq!(backoff.attempts(), 0);
        assert!(backoff.can_retry());

        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_backoff_max_delay_clamping() {
        let policy = RetryPolicy::new()
            .base_delay(Duration::from_secs(10))
            .multiplier(10.0)
            .max_delay(Duration::from_secs(15))
            .jitter(0.0);

        let mut backoff = policy.backoff();
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(), Duration::from_secs(15));
        assert_eq!(backoff.next_delay(), Duration::from_secs(15));
    }

    #[test]
    fn test_backoff_with_jitter_stays_in_range() {
        let policy = RetryPolicy::new()
            .base_delay(Duration::from_secs(1))
            .multiplier(2.0)
            .max_delay(Duration::from_secs(100))
            .jitter(0.2);

        let mut backoff = policy.backoff();
        let delay = backoff.next_delay();
        assert!(delay >= Duration::from_millis(800));
        assert!(delay <= Duration::from_millis(1200));
    }

    #[test]
    fn test_backoff_reset() {
        let policy = RetryPolicy::new()
            .base_delay(Duration::from_secs(1))
            .multiplier(2.0)
            .jitter(0.0)
            .max_retries(5);

        let mut backoff = policy.backoff();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempts(), 2);

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_can_retry() {
        let policy = RetryPolicy::new().max_retries(2).jitter(0.0);
        let mut backoff = policy.backoff();

        assert!(backoff.can_retry());
        backoff.next_delay();
        assert!(backoff.can_retry());
        backoff.next_delay();
        assert!(!backoff.can_retry());
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let result = retry(|| async { Ok::<_, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_non_retryable_error() {
        let result = retry(|| async { Err::<i32, _>(Error::Canceled) }).await;
        assert!(matches!(result, Err(Error::Canceled)));
    }

    #[tokio::test]
    async fn test_retry_with_policy_eventual_success() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let policy = RetryPolicy::new()
            .max_retries(3)
            .base_delay(Duration::from_millis(1))
            .jitter(0.0);

        let result = retry_with_policy(&policy, || {
            let attempts = attempts_clone.clone();
            async move {
                let current = attempts.fetch_add(1, Ordering::SeqCst);
                if current < 2 { Err(unavailable()) } else { Ok(42) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted_returns_last_error() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let policy = RetryPolicy::new()
            .max_retries(2)
            .base_delay(Duration::from_millis(1))
            .jitter(0.0);

        let result = retry_with_policy(&policy, || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(unavailable())
            }
        })
        .await;

        assert!(matches!(result, Err(Error::HttpStatus { .. })));
        // Initial attempt + 2 retries = 3 total.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_rejects_invalid_policy() {
        let invalid = RetryPolicy {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };

        let result = retry_with_policy(&invalid, || async { Ok::<_, Error>(1) }).await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }
}
