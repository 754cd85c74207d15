//! Request/response logging.

use std::time::Instant;

use viaduct_core::{Error, Request, Response};

use crate::interceptor::{BoxFuture, Interceptor, Next};

/// Logs each traversal via `tracing`: a `debug` event when the request is
/// forwarded and a `debug`/`warn` event with the elapsed time when the
/// response (or error) unwinds back through.
///
/// The elapsed time covers the full downstream segment — every interceptor
/// configured after this one plus the terminal exchange — so placing the
/// interceptor first measures end-to-end latency.
#[derive(Clone, Debug, Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    /// Create a logging interceptor.
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for LoggingInterceptor {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Result<Response, Error>> {
        Box::pin(async move {
            let method = request.method().clone();
            let uri = request.uri().clone();
            let started = Instant::now();

            tracing::debug!(method = %method, uri = %uri, "forwarding request");
            let result = next.run(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(response) => {
                    tracing::debug!(
                        method = %method,
                        uri = %uri,
                        status = response.status().as_u16(),
                        elapsed_ms,
                        "request completed"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        method = %method,
                        uri = %uri,
                        error = %error,
                        elapsed_ms,
                        "request failed"
                    );
                }
            }

            result
        })
    }
}
