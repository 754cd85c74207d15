//! The terminal transport capability.
//!
//! A [`Transport`] performs the actual network exchange at the bottom of the
//! chain: `send(Request) -> Result<Response, Error>`, failing with
//! [`Error::Network`], [`Error::HttpStatus`] (the exchange completed with a
//! non-success status) or [`Error::Timeout`]. The pipeline treats it as an
//! external collaborator with no further contract.
//!
//! Closures of the right shape implement `Transport`, so tests can run a
//! pipeline against an in-process terminal:
//!
//! ```ignore
//! use viaduct::{BoxFuture, Error, Pipeline, Request, Response};
//! use http::StatusCode;
//!
//! let transport = |_request: Request| -> BoxFuture<'static, Result<Response, Error>> {
//!     Box::pin(async move { Ok(Response::new(StatusCode::OK)) })
//! };
//! let pipeline = Pipeline::builder(transport).build();
//! ```
//!
//! For production use, [`HyperTransport`] sends requests over HTTP/1.1 or
//! HTTP/2 with connection pooling, and TLS when the `tls` feature (default)
//! is enabled.

mod hyper;

use viaduct_core::{Error, Request, Response};

use crate::interceptor::BoxFuture;

pub use hyper::{HyperTransport, HyperTransportBuilder};

/// The terminal collaborator that performs the real network exchange.
pub trait Transport: Send + Sync {
    /// Perform one exchange for the given request.
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, Error>>;
}

impl<F> Transport for F
where
    F: Fn(Request) -> BoxFuture<'static, Result<Response, Error>> + Send + Sync,
{
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, Error>> {
        (self)(request)
    }
}
