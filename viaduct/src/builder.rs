//! Pipeline builder.
//!
//! Provides a fluent API for assembling a [`Pipeline`]: the terminal
//! transport, the ordered interceptor list, and pipeline-wide defaults.

use std::sync::Arc;
use std::time::Duration;

use crate::interceptor::Interceptor;
use crate::pipeline::Pipeline;
use crate::transport::Transport;

/// Builder for a [`Pipeline`].
///
/// Interceptors run in the order they are added: the first added is the
/// first to see each request and the last to see its response. The set is
/// fixed once [`build`](PipelineBuilder::build) is called; to change it,
/// build a new pipeline.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use viaduct::{HeaderInterceptor, HyperTransport, Pipeline};
///
/// let pipeline = Pipeline::builder(HyperTransport::new())
///     .with_interceptor(HeaderInterceptor::new("user-agent", "viaduct/0.1"))
///     .timeout(Duration::from_secs(30))
///     .build();
/// ```
pub struct PipelineBuilder {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    default_timeout: Option<Duration>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("interceptors", &self.interceptors.len())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl PipelineBuilder {
    /// Create a builder over the given terminal transport.
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Create a builder over an already-shared transport.
    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            interceptors: Vec::new(),
            default_timeout: None,
        }
    }

    /// Append an interceptor to the chain.
    pub fn with_interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Append an already-shared interceptor to the chain.
    pub fn with_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Set the default timeout applied to the terminal exchange of every
    /// call. Individual calls can override it via
    /// [`CallOptions::timeout`](crate::CallOptions::timeout).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Build the pipeline, fixing the interceptor order.
    pub fn build(self) -> Pipeline {
        Pipeline::new(self.transport, self.interceptors, self.default_timeout)
    }
}
