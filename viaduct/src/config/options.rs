//! Per-call options.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

/// Options for a single [`Pipeline::send_with_options`] call.
///
/// Extra headers are merged into the request before it enters the chain
/// (inserting replaces an existing name). The timeout overrides the
/// pipeline-wide default for this call only. A cancellation token lets the
/// caller abort the call while it is in flight; cancellation surfaces as
/// [`Error::Canceled`](viaduct_core::Error::Canceled) on the unwind path.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use viaduct::{CallOptions, CancellationToken};
///
/// let token = CancellationToken::new();
/// let options = CallOptions::new()
///     .timeout(Duration::from_secs(5))
///     .cancel_token(token.clone());
/// // later, from anywhere: token.cancel();
/// ```
///
/// [`Pipeline::send_with_options`]: crate::Pipeline::send_with_options
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    headers: HeaderMap,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl CallOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header to merge into the request.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the pipeline's default timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token to this call.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn into_parts(
        self,
    ) -> (HeaderMap, Option<Duration>, Option<CancellationToken>) {
        (self.headers, self.timeout, self.cancel)
    }
}
