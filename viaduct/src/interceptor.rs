//! The interceptor contract: [`Interceptor`], [`Next`], and adapters.
//!
//! An interceptor receives a [`Request`] and a [`Next`] continuation
//! representing the rest of the chain (later interceptors plus the terminal
//! transport). It can:
//!
//! - forward the request unchanged or transformed: `next.run(request).await`
//! - short-circuit by returning a synthesized response without running `next`
//! - observe or transform the response (or error) produced by `next`
//! - recover from an error, or translate it into a different error kind
//!
//! `Next` is consumed by [`Next::run`], so each value can forward at most
//! once; deliberate re-entry (retry, credential refresh) requires an explicit
//! `clone()` before the first run. Re-running a cloned `Next` re-enters the
//! chain *from this interceptor's position* — upstream interceptors see a
//! single traversal.
//!
//! # Example
//!
//! ```ignore
//! use viaduct::{FnInterceptor, Next, Request};
//!
//! let logging = FnInterceptor::new(|request: Request, next: Next| {
//!     Box::pin(async move {
//!         println!("-> {} {}", request.method(), request.uri());
//!         let result = next.run(request).await;
//!         println!("<- done");
//!         result
//!     })
//! });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use viaduct_core::{Error, Request, Response};

/// Type alias for a boxed future returning a result.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The signature of a fully-composed request handler.
///
/// The terminal transport, and every partially-wrapped chain suffix, have
/// this shape; interceptors wrap one handler to produce another.
pub type Handler =
    Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Response, Error>> + Send + Sync>;

/// The continuation for the rest of the chain.
///
/// Running `Next` forwards the request to the next interceptor (or the
/// terminal transport) and resolves to that segment's response or error.
/// The value is consumed by [`run`](Next::run): forwarding twice requires a
/// deliberate `clone()`.
#[derive(Clone)]
pub struct Next {
    inner: Handler,
}

impl Next {
    pub(crate) fn new(inner: Handler) -> Self {
        Self { inner }
    }

    /// Forward the request to the remainder of the chain.
    pub async fn run(self, request: Request) -> Result<Response, Error> {
        (self.inner)(request).await
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// A chain link that can observe or transform a request and its eventual
/// response or error.
///
/// Implementations must be `Send + Sync`: one interceptor instance is shared
/// by every concurrent traversal of the pipeline, so any mutable state it
/// holds needs its own synchronization.
pub trait Interceptor: Send + Sync {
    /// Handle a request, either forwarding it through `next` (at most once
    /// per `Next` value) or short-circuiting with a synthesized result.
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Result<Response, Error>>;
}

/// Compose the ordered interceptor list onto a terminal handler.
///
/// Interceptors are applied in reverse so the first configured interceptor
/// is the first to see the request; responses unwind through the same stack
/// in the opposite order.
pub(crate) fn compose(interceptors: &[Arc<dyn Interceptor>], terminal: Handler) -> Handler {
    let mut handler = terminal;
    for interceptor in interceptors.iter().rev() {
        let interceptor = Arc::clone(interceptor);
        let inner = handler;
        handler = Arc::new(move |request: Request| {
            interceptor.handle(request, Next::new(Arc::clone(&inner)))
        });
    }
    handler
}

/// A function-based interceptor.
///
/// Adapts a closure of shape `(Request, Next) -> BoxFuture` to the
/// [`Interceptor`] trait, for cross-cutting logic that doesn't warrant a
/// named type.
///
/// # Example
///
/// ```ignore
/// use viaduct::{FnInterceptor, Next, Request};
///
/// let tag = FnInterceptor::new(|request: Request, next: Next| {
///     Box::pin(async move {
///         let request = request.with_header(
///             "x-trace-id".parse().unwrap(),
///             "abc123".parse().unwrap(),
///         );
///         next.run(request).await
///     })
/// });
/// ```
pub struct FnInterceptor<F> {
    func: F,
}

impl<F> FnInterceptor<F>
where
    F: Fn(Request, Next) -> BoxFuture<'static, Result<Response, Error>> + Send + Sync,
{
    /// Create an interceptor from a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(Request, Next) -> BoxFuture<'static, Result<Response, Error>> + Send + Sync,
{
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Result<Response, Error>> {
        (self.func)(request, next)
    }
}

impl<F: Clone> Clone for FnInterceptor<F> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
        }
    }
}

/// An interceptor that inserts a fixed header on every request.
///
/// # Example
///
/// ```
/// use viaduct::HeaderInterceptor;
///
/// let ua = HeaderInterceptor::new("user-agent", "viaduct/0.1");
/// ```
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderInterceptor {
    /// Create a new header interceptor.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.parse().expect("invalid header name"),
            value: value.parse().expect("invalid header value"),
        }
    }

    /// Try to create a new header interceptor, returning an error if invalid.
    pub fn try_new(name: &str, value: &str) -> Result<Self, Error> {
        let name = name
            .parse()
            .map_err(|_| Error::InvalidRequest(format!("invalid header name: {name}")))?;
        let value = value
            .parse()
            .map_err(|_| Error::InvalidRequest(format!("invalid header value: {value}")))?;
        Ok(Self { name, value })
    }

    /// Create a new header interceptor from pre-parsed values.
    pub fn from_parts(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

impl Interceptor for HeaderInterceptor {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Result<Response, Error>> {
        let request = request.with_header(self.name.clone(), self.value.clone());
        Box::pin(next.run(request))
    }
}
