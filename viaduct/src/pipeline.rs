//! The pipeline dispatcher.
//!
//! A [`Pipeline`] owns an ordered interceptor list and a terminal
//! [`Transport`], composed into a single callable entry point. Calling
//! [`send`](Pipeline::send) is indistinguishable from calling the transport
//! directly — same signature, same error taxonomy — which is what makes the
//! composition transparent to callers.
//!
//! The interceptor order is fixed when the pipeline is built; changing the
//! set requires building a new pipeline. The pipeline itself holds no
//! mutable state, so one instance (or clones of it — cloning is cheap and
//! shares the chain) can serve any number of concurrent requests.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use viaduct_core::{Error, Request, Response};

use crate::builder::PipelineBuilder;
use crate::config::CallOptions;
use crate::interceptor::{Handler, Interceptor, compose};
use crate::transport::Transport;

/// A fixed, ordered composition of interceptors plus a terminal transport.
///
/// # Example
///
/// ```ignore
/// use viaduct::{HeaderInterceptor, HyperTransport, Pipeline, Request};
///
/// let pipeline = Pipeline::builder(HyperTransport::new())
///     .with_interceptor(HeaderInterceptor::new("user-agent", "viaduct/0.1"))
///     .timeout(std::time::Duration::from_secs(30))
///     .build();
///
/// let response = pipeline.send(Request::get("http://localhost:3000/api/config")?).await?;
/// ```
#[derive(Clone)]
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    default_timeout: Option<Duration>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("interceptors", &self.interceptors.len())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl Pipeline {
    /// Create a [`PipelineBuilder`] over the given terminal transport.
    pub fn builder<T: Transport + 'static>(transport: T) -> PipelineBuilder {
        PipelineBuilder::new(transport)
    }

    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        interceptors: Vec<Arc<dyn Interceptor>>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            interceptors: interceptors.into(),
            default_timeout,
        }
    }

    /// Number of interceptors in the chain.
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Send a request through the chain with default options.
    pub async fn send(&self, request: Request) -> Result<Response, Error> {
        self.send_with_options(request, CallOptions::new()).await
    }

    /// Send a request through the chain with per-call options (extra
    /// headers, timeout override, cancellation token).
    ///
    /// Interceptors run in configuration order on the way down and in exact
    /// reverse order on the way back. A panic inside an interceptor is
    /// contained and surfaced as [`Error::Defect`].
    pub async fn send_with_options(
        &self,
        request: Request,
        options: CallOptions,
    ) -> Result<Response, Error> {
        let (headers, timeout, cancel) = options.into_parts();

        let request = if headers.is_empty() {
            request
        } else {
            request.with_headers(headers)
        };

        if let Some(token) = &cancel {
            if token.is_cancelled() {
                return Err(Error::Canceled);
            }
        }

        let timeout = timeout.or(self.default_timeout);
        let terminal = self.terminal(timeout, cancel);
        let handler = compose(&self.interceptors, terminal);

        // The async block defers `handler(request)` until it is polled, so a
        // panic raised while an interceptor builds its future is contained
        // too, not just one raised mid-await.
        let traversal = AssertUnwindSafe(async move { handler(request).await });
        match traversal.catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(Error::Defect(panic_message(&panic))),
        }
    }

    /// Build the terminal handler for one call: the transport guarded by the
    /// effective timeout and the caller's cancellation token.
    ///
    /// Cancellation is surfaced *here*, at the bottom of the chain, so that
    /// it propagates back up as an `Err` through every interceptor currently
    /// suspended on `next` — preserving the reverse unwind order. Losing the
    /// `select!` race drops the transport future, which aborts the
    /// underlying I/O.
    fn terminal(&self, timeout: Option<Duration>, cancel: Option<CancellationToken>) -> Handler {
        let transport = Arc::clone(&self.transport);
        Arc::new(move |request: Request| {
            let transport = Arc::clone(&transport);
            let cancel = cancel.clone();
            Box::pin(async move {
                let exchange = async {
                    let fut = transport.send(request);
                    match timeout {
                        Some(limit) => match tokio::time::timeout(limit, fut).await {
                            Ok(result) => result,
                            Err(_) => Err(Error::Timeout(limit)),
                        },
                        None => fut.await,
                    }
                };
                match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = token.cancelled() => Err(Error::Canceled),
                            result = exchange => result,
                        }
                    }
                    None => exchange.await,
                }
            })
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "interceptor panicked".to_string()
    }
}
