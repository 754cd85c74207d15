//! Built-in interceptors.
//!
//! - [`BearerAuthInterceptor`]: bearer credential injection with
//!   refresh-and-retry on 401
//! - [`CacheInterceptor`]: GET response cache with short-circuit on hit
//! - [`LoggingInterceptor`]: request/response logging via `tracing`
//! - [`RetryInterceptor`]: downstream-segment retry with exponential backoff
//!
//! [`HeaderInterceptor`](crate::HeaderInterceptor) and
//! [`FnInterceptor`](crate::FnInterceptor) live next to the contract in the
//! `interceptor` module.

mod auth;
mod cache;
mod logging;
mod retry;

pub use auth::{BearerAuthInterceptor, TokenProvider, TokenStore};
pub use cache::{CacheInterceptor, ResponseCache};
pub use logging::LoggingInterceptor;
pub use retry::RetryInterceptor;
