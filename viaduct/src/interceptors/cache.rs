//! GET response cache with short-circuit on hit.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use viaduct_core::{Error, Method, Request, Response, Uri};

use crate::interceptor::{BoxFuture, Interceptor, Next};

/// A shared in-memory response cache keyed by (method, URI).
///
/// Safe under concurrent traversals: lookups take a read lock, stores take a
/// write lock, and no lock is held across an await point. Entries can be
/// pre-populated with [`insert`](ResponseCache::insert).
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<(Method, String), Response>>>,
}

impl ResponseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a response for the given method and URI.
    pub fn insert(&self, method: Method, uri: &Uri, response: Response) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method, uri.to_string()), response);
    }

    /// Look up a cached response.
    pub fn get(&self, method: &Method, uri: &Uri) -> Option<Response> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(method.clone(), uri.to_string()))
            .cloned()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Serves GET requests from a [`ResponseCache`], short-circuiting the rest
/// of the chain (including the terminal transport) on a hit.
///
/// On a miss the request is forwarded; successful responses are stored on
/// the way back. Non-GET requests pass through untouched.
///
/// # Example
///
/// ```ignore
/// use viaduct::{CacheInterceptor, Pipeline, ResponseCache};
///
/// let cache = ResponseCache::new();
/// let pipeline = Pipeline::builder(transport)
///     .with_interceptor(CacheInterceptor::new(cache.clone()))
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct CacheInterceptor {
    cache: ResponseCache,
}

impl CacheInterceptor {
    /// Create an interceptor backed by the given cache.
    pub fn new(cache: ResponseCache) -> Self {
        Self { cache }
    }
}

impl Interceptor for CacheInterceptor {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Result<Response, Error>> {
        let cache = self.cache.clone();
        Box::pin(async move {
            if *request.method() != Method::GET {
                return next.run(request).await;
            }

            if let Some(hit) = cache.get(request.method(), request.uri()) {
                tracing::debug!(uri = %request.uri(), "cache hit");
                return Ok(hit);
            }

            let method = request.method().clone();
            let uri = request.uri().clone();
            let response = next.run(request).await?;
            if response.is_success() {
                cache.insert(method, &uri, response.clone());
            }
            Ok(response)
        })
    }
}
