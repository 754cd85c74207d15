//! Response value object.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;

use crate::Error;

/// An HTTP response snapshot, produced once per request attempt.
///
/// Like [`Request`](crate::Request), a `Response` is a value object:
/// interceptors observing it on the unwind path receive their own snapshot
/// and transform it by building a new value.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create a response with the given status, no headers, and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Assemble a response from its parts. Used by transports.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Return a new response with the header inserted.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Return a new response with the given body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// The body interpreted as UTF-8 text.
    pub fn text(&self) -> Result<&str, Error> {
        std::str::from_utf8(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_rejects_invalid_utf8() {
        let response = Response::new(StatusCode::OK).with_body(vec![0xff, 0xfe]);
        assert!(matches!(response.text(), Err(Error::Decode(_))));
    }

    #[test]
    fn test_json_decode() {
        #[derive(serde::Deserialize)]
        struct Config {
            feature: String,
        }

        let response = Response::new(StatusCode::OK).with_body(r#"{"feature":"on"}"#);
        let config: Config = response.json().unwrap();
        assert_eq!(config.feature, "on");

        let broken = Response::new(StatusCode::OK).with_body("not json");
        assert!(matches!(broken.json::<Config>(), Err(Error::Decode(_))));
    }

    #[test]
    fn test_is_success() {
        assert!(Response::new(StatusCode::OK).is_success());
        assert!(!Response::new(StatusCode::BAD_GATEWAY).is_success());
    }
}
