//! Core types for the viaduct interceptor pipeline.
//!
//! This crate holds the value objects shared by the pipeline, interceptors,
//! and transports:
//!
//! - [`Request`]: an immutable HTTP request snapshot
//! - [`Response`]: an HTTP response snapshot
//! - [`Error`]: the closed error taxonomy for a request's traversal
//!
//! Both `Request` and `Response` are cheap to clone (`Bytes` bodies, shared
//! header maps are copied on transform) and every transformation produces a
//! new value, so concurrent traversals of the same pipeline never observe
//! each other's state.

mod error;
mod request;
mod response;

pub use error::Error;
pub use request::Request;
pub use response::Response;

// Re-export the HTTP vocabulary so downstream crates don't need a direct
// `http`/`bytes` dependency for ordinary use.
pub use bytes::Bytes;
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
