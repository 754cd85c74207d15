//! Immutable request value object.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;

use crate::Error;

/// An immutable HTTP request snapshot.
///
/// A `Request` is created once per call site and flows through the pipeline
/// exactly once. There is no mutable access: every transformation (`with_*`)
/// consumes the value and returns a new one, so an interceptor can never
/// corrupt the snapshot seen by its neighbours — cloning before a transform
/// is all it takes to keep the original.
///
/// Query parameters are carried by the [`Uri`]; header insertion keeps keys
/// unique (inserting an existing name replaces the previous value).
///
/// # Example
///
/// ```
/// use viaduct_core::{Method, Request};
///
/// let request = Request::get("http://localhost:3000/api/config?env=prod").unwrap();
/// assert_eq!(request.method(), &Method::GET);
/// assert_eq!(request.path(), "/api/config");
/// assert_eq!(request.query(), Some("env=prod"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Create a request with the given method and URI and an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a GET request, parsing the URI.
    pub fn get<U>(uri: U) -> Result<Self, Error>
    where
        U: TryInto<Uri>,
        U::Error: std::fmt::Display,
    {
        Self::parse(Method::GET, uri)
    }

    /// Create a POST request, parsing the URI.
    pub fn post<U>(uri: U) -> Result<Self, Error>
    where
        U: TryInto<Uri>,
        U::Error: std::fmt::Display,
    {
        Self::parse(Method::POST, uri)
    }

    /// Create a PUT request, parsing the URI.
    pub fn put<U>(uri: U) -> Result<Self, Error>
    where
        U: TryInto<Uri>,
        U::Error: std::fmt::Display,
    {
        Self::parse(Method::PUT, uri)
    }

    /// Create a DELETE request, parsing the URI.
    pub fn delete<U>(uri: U) -> Result<Self, Error>
    where
        U: TryInto<Uri>,
        U::Error: std::fmt::Display,
    {
        Self::parse(Method::DELETE, uri)
    }

    fn parse<U>(method: Method, uri: U) -> Result<Self, Error>
    where
        U: TryInto<Uri>,
        U::Error: std::fmt::Display,
    {
        let uri = uri
            .try_into()
            .map_err(|e| Error::InvalidRequest(format!("invalid URI: {e}")))?;
        Ok(Self::new(method, uri))
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The URI path component.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The URI query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Return a new request with the given method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Return a new request with the given URI.
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Return a new request with the header inserted.
    ///
    /// Inserting a name that is already present replaces the previous value,
    /// keeping header keys unique.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Return a new request with every entry of `headers` inserted.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Return a new request with the given body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Return a new request carrying `value` encoded as a JSON body, with
    /// `Content-Type: application/json` set.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string()))?;
        Ok(self
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    /// Decompose the request into its parts. Used by transports to build the
    /// on-the-wire request.
    pub fn into_parts(self) -> (Method, Uri, HeaderMap, Bytes) {
        (self.method, self.uri, self.headers, self.body)
    }
}
