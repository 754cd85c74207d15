//! Hyper-based terminal transport.
//!
//! [`HyperTransport`] drives the exchange over hyper_util's pooled legacy
//! client: HTTP/1.1 and HTTP/2, connection reuse across calls, and — with
//! the default `tls` feature — HTTPS via rustls with the bundled webpki
//! root store.
//!
//! Non-success statuses are reported as [`Error::HttpStatus`] carrying the
//! response body as text, so recovering interceptors (auth refresh, retry)
//! can act on them.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use viaduct_core::{Error, Request, Response};

use crate::interceptor::BoxFuture;
use crate::transport::Transport;

#[cfg(feature = "tls")]
type Connector = hyper_rustls::HttpsConnector<HttpConnector>;
#[cfg(not(feature = "tls"))]
type Connector = HttpConnector;

/// A pooled hyper client implementing [`Transport`].
///
/// # Example
///
/// ```ignore
/// use viaduct::{HyperTransport, Pipeline};
///
/// let pipeline = Pipeline::builder(HyperTransport::new()).build();
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<Connector, Full<Bytes>>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default settings.
    pub fn new() -> Self {
        HyperTransportBuilder::new().build()
    }

    /// Create a builder for customization.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, Error>> {
        let client = self.client.clone();
        Box::pin(async move {
            let (method, uri, headers, body) = request.into_parts();

            let mut outgoing = http::Request::builder()
                .method(method)
                .uri(uri)
                .body(Full::new(body))
                .map_err(|e| Error::InvalidRequest(e.to_string()))?;
            *outgoing.headers_mut() = headers;

            let incoming = client
                .request(outgoing)
                .await
                .map_err(|e| Error::Network(e.to_string()))?;

            let status = incoming.status();
            let headers = incoming.headers().clone();
            let body = incoming
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::Network(e.to_string()))?
                .to_bytes();

            if !status.is_success() {
                let message =
                    (!body.is_empty()).then(|| String::from_utf8_lossy(&body).into_owned());
                return Err(Error::HttpStatus { status, message });
            }

            Ok(Response::from_parts(status, headers, body))
        })
    }
}

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use viaduct::HyperTransportBuilder;
///
/// let transport = HyperTransportBuilder::new()
///     .connect_timeout(Duration::from_secs(5))
///     .pool_idle_timeout(Duration::from_secs(60))
///     .build();
/// ```
#[derive(Clone, Debug, Default)]
pub struct HyperTransportBuilder {
    connect_timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
    http2_only: bool,
}

impl HyperTransportBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the time spent establishing a TCP connection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// How long an idle pooled connection is kept alive.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Speak HTTP/2 exclusively (prior knowledge, no HTTP/1.1 fallback).
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Build the transport.
    pub fn build(self) -> HyperTransport {
        let connector = self.connector();

        let mut builder = Client::builder(TokioExecutor::new());
        // The pool timer is required for pool_idle_timeout to take effect.
        builder.pool_timer(TokioTimer::new());
        if let Some(idle) = self.pool_idle_timeout {
            builder.pool_idle_timeout(idle);
        }
        if self.http2_only {
            builder.http2_only(true);
        }

        HyperTransport {
            client: builder.build(connector),
        }
    }

    fn http_connector(&self, enforce_http: bool) -> HttpConnector {
        let mut http = HttpConnector::new();
        http.set_connect_timeout(self.connect_timeout);
        http.enforce_http(enforce_http);
        http
    }

    #[cfg(feature = "tls")]
    fn connector(&self) -> Connector {
        hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_all_versions()
            .wrap_connector(self.http_connector(false))
    }

    #[cfg(not(feature = "tls"))]
    fn connector(&self) -> Connector {
        self.http_connector(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_builds_with_defaults() {
        let transport = HyperTransport::new();
        assert!(format!("{transport:?}").contains("HyperTransport"));
    }

    #[test]
    fn test_builder_options_compose() {
        let _transport = HyperTransportBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(60))
            .http2_only(false)
            .build();
    }
}
