//! Bearer credential injection with refresh-and-retry.

use std::sync::Arc;

use http::HeaderValue;
use http::header::AUTHORIZATION;
use tokio::sync::RwLock;
use viaduct_core::{Error, Request, Response, StatusCode};

use crate::interceptor::{BoxFuture, Interceptor, Next};

/// A shared credential store.
///
/// One store instance can back any number of concurrent traversals (and
/// several pipelines); reads and writes go through an async `RwLock`, so a
/// refresh in one traversal is immediately visible to the others.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an initial token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// The current token, if any.
    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    /// Replace the stored token.
    pub async fn set(&self, token: impl Into<String>) {
        *self.inner.write().await = Some(token.into());
    }

    /// Drop the stored token.
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

/// Produces a fresh credential when the current one is rejected.
///
/// Concurrent traversals may each observe a 401 and call `refresh`;
/// deduplicating those calls (single-flight) is the implementation's
/// business — the store itself only guarantees that the last write wins.
pub trait TokenProvider: Send + Sync {
    /// Obtain a fresh token, e.g. from an OAuth token endpoint.
    fn refresh(&self) -> BoxFuture<'static, Result<String, Error>>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> BoxFuture<'static, Result<String, Error>> + Send + Sync,
{
    fn refresh(&self) -> BoxFuture<'static, Result<String, Error>> {
        (self)()
    }
}

/// Injects `Authorization: Bearer <token>` from a shared [`TokenStore`].
///
/// When the downstream chain answers 401 and a [`TokenProvider`] is
/// configured, the interceptor refreshes the credential, stores it, and
/// re-runs **the downstream segment only** — once. Upstream interceptors
/// observe a single traversal; the retried request re-enters the chain from
/// this interceptor's position.
///
/// # Example
///
/// ```ignore
/// use viaduct::{BearerAuthInterceptor, Pipeline, TokenStore};
///
/// let store = TokenStore::with_token("abc");
/// let pipeline = Pipeline::builder(transport)
///     .with_interceptor(BearerAuthInterceptor::new(store.clone()))
///     .build();
/// ```
pub struct BearerAuthInterceptor {
    store: TokenStore,
    provider: Option<Arc<dyn TokenProvider>>,
}

impl BearerAuthInterceptor {
    /// Create an interceptor that injects tokens from `store` and never
    /// refreshes.
    pub fn new(store: TokenStore) -> Self {
        Self {
            store,
            provider: None,
        }
    }

    /// Attach a provider used to refresh the credential on 401.
    pub fn with_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.provider = Some(provider);
        self
    }
}

impl std::fmt::Debug for BearerAuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthInterceptor")
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

fn bearer(request: &Request, token: &str) -> Result<Request, Error> {
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| Error::InvalidRequest("token is not a valid header value".into()))?;
    Ok(request.clone().with_header(AUTHORIZATION, value))
}

impl Interceptor for BearerAuthInterceptor {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Result<Response, Error>> {
        let store = self.store.clone();
        let provider = self.provider.clone();
        Box::pin(async move {
            let first = match store.get().await {
                Some(token) => bearer(&request, &token)?,
                None => request.clone(),
            };

            // Keep a handle on the downstream segment in case the
            // credential is rejected and we get one more attempt.
            let second_chance = next.clone();
            let outcome = next.run(first).await;

            let unauthorized = matches!(
                &outcome,
                Err(Error::HttpStatus { status, .. }) if *status == StatusCode::UNAUTHORIZED
            );
            if !unauthorized {
                return outcome;
            }
            let Some(provider) = provider else {
                return outcome;
            };

            tracing::debug!(uri = %request.uri(), "credential rejected, refreshing");
            let fresh = provider.refresh().await?;
            store.set(fresh.clone()).await;

            second_chance.run(bearer(&request, &fresh)?).await
        })
    }
}
