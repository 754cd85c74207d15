//! Call-level configuration.
//!
//! - [`CallOptions`]: per-call headers, timeout override, cancellation token
//! - [`RetryPolicy`] / [`ExponentialBackoff`]: retry behavior with
//!   exponential backoff and jitter, plus the [`retry`] and
//!   [`retry_with_policy`] helpers

mod options;
mod retry;

pub use options::CallOptions;
pub use retry::{ExponentialBackoff, RetryPolicy, defaults, retry, retry_with_policy};
