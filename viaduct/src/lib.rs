//! Composable HTTP interceptor pipeline.
//!
//! `viaduct` composes an ordered chain of [`Interceptor`]s with a terminal
//! [`Transport`] into a single callable [`Pipeline`]. Each interceptor
//! receives the request and a [`Next`] continuation for the rest of the
//! chain; it can transform the request on the way down, transform or observe
//! the response (or error) on the way back, short-circuit (cache hit), or
//! recover from an error (credential refresh, retry).
//!
//! For one request the traversal is strictly stack-shaped: interceptors run
//! in configuration order downwards and in exact reverse order upwards. The
//! pipeline itself is immutable and cheap to clone, so any number of
//! requests can traverse it concurrently — each carries its own
//! request/response snapshots, and whatever state interceptors share (a
//! token store, a response cache) carries its own synchronization.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use viaduct::{
//!     BearerAuthInterceptor, HyperTransport, LoggingInterceptor, Pipeline, Request, TokenStore,
//! };
//!
//! let store = TokenStore::with_token("abc");
//!
//! let pipeline = Pipeline::builder(HyperTransport::new())
//!     .with_interceptor(LoggingInterceptor::new())
//!     .with_interceptor(BearerAuthInterceptor::new(store))
//!     .timeout(Duration::from_secs(30))
//!     .build();
//!
//! let response = pipeline
//!     .send(Request::get("https://api.example.com/config")?)
//!     .await?;
//! println!("{}", response.text()?);
//! ```
//!
//! ## Cancellation
//!
//! Attach a [`CancellationToken`] to a call to abort it while in flight.
//! Cancellation aborts the terminal I/O and unwinds through the chain as
//! [`Error::Canceled`], so every interceptor suspended on `next` observes
//! it in reverse order:
//!
//! ```ignore
//! use viaduct::{CallOptions, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let options = CallOptions::new().cancel_token(token.clone());
//!
//! tokio::spawn({
//!     let token = token.clone();
//!     async move {
//!         tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//!         token.cancel();
//!     }
//! });
//!
//! let result = pipeline.send_with_options(request, options).await;
//! assert!(matches!(result, Err(viaduct::Error::Canceled)));
//! ```
//!
//! ## Errors
//!
//! Every failure is a variant of the closed [`Error`] enum — network
//! failure, HTTP status, timeout, cancellation, defect — so recovery logic
//! matches exhaustively instead of inspecting types at runtime. Absent a
//! recovering interceptor, the original error reaches the caller unchanged.
//!
//! ## Retries
//!
//! Two granularities, both driven by [`RetryPolicy`]:
//!
//! - [`RetryInterceptor`] retries the downstream segment from its own
//!   position in the chain;
//! - [`retry_with_policy`] re-runs a whole pipeline call.

mod builder;
pub mod config;
mod interceptor;
mod interceptors;
mod pipeline;
pub mod transport;

pub use builder::PipelineBuilder;
pub use interceptor::{BoxFuture, FnInterceptor, Handler, HeaderInterceptor, Interceptor, Next};
pub use interceptors::{
    BearerAuthInterceptor, CacheInterceptor, LoggingInterceptor, ResponseCache, RetryInterceptor,
    TokenProvider, TokenStore,
};
pub use pipeline::Pipeline;

// Re-export from config module
pub use config::{CallOptions, ExponentialBackoff, RetryPolicy, retry, retry_with_policy};

// Re-export transport types at the top level for convenience
pub use transport::{HyperTransport, HyperTransportBuilder, Transport};

// Re-export core types that users need
pub use viaduct_core::{Error, Request, Response};

// Re-export the cancellation token so callers don't need a direct
// tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
