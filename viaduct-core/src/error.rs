//! Error taxonomy for a request's traversal of the pipeline.

use std::time::Duration;

use http::StatusCode;

/// Errors produced while a request traverses the pipeline.
///
/// This is a closed set: every failure an interceptor can observe is one of
/// these variants, so recovery logic can match exhaustively instead of
/// inspecting types at runtime.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The transport could not reach the remote endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// The exchange completed but the endpoint returned a non-success status.
    ///
    /// `message` carries the response body as text when one was present, so
    /// a recovering interceptor (or the caller) can diagnose the failure.
    #[error("HTTP {status}")]
    HttpStatus {
        status: StatusCode,
        message: Option<String>,
    },

    /// No response arrived within the configured bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller aborted the request while it was in flight.
    #[error("request canceled")]
    Canceled,

    /// An interceptor violated the pipeline contract (it panicked instead of
    /// producing a response or an error). Always fatal; never recovered.
    #[error("pipeline defect: {0}")]
    Defect(String),

    /// A request body could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The request itself was malformed (invalid URL, header, or options).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns whether this error indicates a transient condition that may
    /// be resolved by retrying.
    ///
    /// Network failures and server-side statuses (5xx, plus 429 rate
    /// limiting) are considered transient. Timeouts are deliberately *not*
    /// retryable by default — retrying them is an explicit policy choice.
    /// Cancellation and pipeline defects are never retryable.
    ///
    /// # Example
    ///
    /// ```
    /// use viaduct_core::{Error, StatusCode};
    ///
    /// let err = Error::Network("connection refused".into());
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::HttpStatus { status: StatusCode::NOT_FOUND, message: None };
    /// assert!(!err.is_retryable());
    ///
    /// assert!(!Error::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
