//! Downstream-segment retry.

use viaduct_core::{Error, Request, Response};

use crate::config::RetryPolicy;
use crate::interceptor::{BoxFuture, Interceptor, Next};

/// Retries the downstream segment of the chain with exponential backoff.
///
/// Each attempt re-runs a cloned `Next`, i.e. re-enters the chain **from
/// this interceptor's position**: interceptors configured before it observe
/// a single traversal, interceptors after it (and the terminal transport)
/// run once per attempt. To re-run the whole chain instead, wrap the
/// pipeline call in [`retry_with_policy`](crate::retry_with_policy).
///
/// Which errors qualify is decided by [`RetryPolicy::should_retry`]:
/// transient failures by default, timeouts only when the policy opts in,
/// cancellation and defects never.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use viaduct::{Pipeline, RetryInterceptor, RetryPolicy};
///
/// let pipeline = Pipeline::builder(transport)
///     .with_interceptor(RetryInterceptor::new(
///         RetryPolicy::new().max_retries(3).base_delay(Duration::from_millis(100)),
///     ))
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct RetryInterceptor {
    policy: RetryPolicy,
}

impl RetryInterceptor {
    /// Create a retry interceptor with the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Create a retry interceptor with the default policy.
    pub fn with_defaults() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl Interceptor for RetryInterceptor {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Result<Response, Error>> {
        let policy = self.policy.clone();
        Box::pin(async move {
            if let Err(msg) = policy.validate() {
                return Err(Error::InvalidRequest(format!("invalid retry policy: {msg}")));
            }

            let mut backoff = policy.backoff();
            loop {
                match next.clone().run(request.clone()).await {
                    Ok(response) => return Ok(response),
                    Err(error) if policy.should_retry(&error) && backoff.can_retry() => {
                        let delay = backoff.next_delay();
                        tracing::debug!(
                            uri = %request.uri(),
                            error = %error,
                            attempt = backoff.attempts(),
                            delay_ms = delay.as_millis() as u64,
                            "retrying downstream segment"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(error) => return Err(error),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use http::StatusCode;

    use super::*;
    use crate::{FnInterceptor, Pipeline};

    fn fail_n_times(
        failures: u32,
        calls: Arc<AtomicU32>,
    ) -> impl Fn(Request) -> BoxFuture<'static, Result<Response, Error>> + Send + Sync {
        move |_request: Request| {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(Error::HttpStatus {
                        status: StatusCode::SERVICE_UNAVAILABLE,
                        message: None,
                    })
                } else {
                    Ok(Response::new(StatusCode::OK))
                }
            })
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new()
            .max_retries(max_retries)
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .jitter(0.0)
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let pipeline = Pipeline::builder(fail_n_times(2, calls.clone()))
            .with_interceptor(RetryInterceptor::new(fast_policy(3)))
            .build();

        let response = pipeline
            .send(Request::get("http://localhost/flaky").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let pipeline = Pipeline::builder(fail_n_times(10, calls.clone()))
            .with_interceptor(RetryInterceptor::new(fast_policy(2)))
            .build();

        let result = pipeline
            .send(Request::get("http://localhost/flaky").unwrap())
            .await;

        assert!(matches!(result, Err(Error::HttpStatus { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let transport = move |_request: Request| -> BoxFuture<'static, Result<Response, Error>> {
            let calls = calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::HttpStatus {
                    status: StatusCode::NOT_FOUND,
                    message: None,
                })
            })
        };

        let pipeline = Pipeline::builder(transport)
            .with_interceptor(RetryInterceptor::new(fast_policy(3)))
            .build();

        let result = pipeline
            .send(Request::get("http://localhost/missing").unwrap())
            .await;

        assert!(matches!(result, Err(Error::HttpStatus { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upstream_interceptors_see_one_traversal() {
        let upstream_calls = Arc::new(AtomicU32::new(0));
        let upstream_clone = upstream_calls.clone();
        let upstream = FnInterceptor::new(move |request: Request, next: Next| {
            let calls = upstream_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                next.run(request).await
            })
        });

        let downstream_calls = Arc::new(AtomicU32::new(0));
        let downstream_clone = downstream_calls.clone();
        let downstream = FnInterceptor::new(move |request: Request, next: Next| {
            let calls = downstream_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                next.run(request).await
            })
        });

        let transport_calls = Arc::new(AtomicU32::new(0));
        let pipeline = Pipeline::builder(fail_n_times(2, transport_calls.clone()))
            .with_interceptor(upstream)
            .with_interceptor(RetryInterceptor::new(fast_policy(3)))
            .with_interceptor(downstream)
            .build();

        pipeline
            .send(Request::get("http://localhost/flaky").unwrap())
            .await
            .unwrap();

        // The retried attempt re-enters from the retry interceptor's
        // position: upstream runs once, downstream runs per attempt.
        assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);
        assert_eq!(downstream_calls.load(Ordering::SeqCst), 3);
        assert_eq!(transport_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_canceled_never_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let transport = move |_request: Request| -> BoxFuture<'static, Result<Response, Error>> {
            let calls = calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Canceled)
            })
        };

        let pipeline = Pipeline::builder(transport)
            .with_interceptor(RetryInterceptor::new(fast_policy(5)))
            .build();

        let result = pipeline
            .send(Request::get("http://localhost/x").unwrap())
            .await;

        assert!(matches!(result, Err(Error::Canceled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_retried_only_by_opt_in() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let transport = move |_request: Request| -> BoxFuture<'static, Result<Response, Error>> {
            let calls = calls_clone.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(Error::Timeout(Duration::from_millis(10)))
                } else {
                    Ok(Response::new(StatusCode::OK))
                }
            })
        };

        let pipeline = Pipeline::builder(transport)
            .with_interceptor(RetryInterceptor::new(fast_policy(3).retry_on_timeout(true)))
            .build();

        let response = pipeline
            .send(Request::get("http://localhost/x").unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
