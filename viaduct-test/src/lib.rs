//! Fixture HTTP server for end-to-end pipeline tests.
//!
//! Starts a real axum server on `127.0.0.1:0` and exposes endpoints the
//! tests drive through a full pipeline + hyper transport:
//!
//! - `GET /headers` — echoes the received request headers as JSON
//! - `GET /config` — a small JSON document, counting hits
//! - `GET /protected` — 401 unless the bearer token is current
//! - `GET /flaky` — 503 for the first two hits, then 200
//! - `GET /slow` — sleeps before answering; used by timeout/cancel tests
//! - `POST /echo` — echoes the request body back

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};

/// The bearer token `/protected` accepts.
pub const VALID_TOKEN: &str = "refreshed-token";

/// Shared counters so tests can assert how often the server was reached.
#[derive(Clone, Default)]
pub struct FixtureState {
    pub config_hits: Arc<AtomicU32>,
    pub flaky_hits: Arc<AtomicU32>,
    pub slow_hits: Arc<AtomicU32>,
}

/// Build the fixture router.
pub fn app(state: FixtureState) -> Router {
    Router::new()
        .route("/headers", get(echo_headers))
        .route("/config", get(config))
        .route("/protected", get(protected))
        .route("/flaky", get(flaky))
        .route("/slow", get(slow))
        .route("/echo", post(echo_body))
        .with_state(state)
}

/// Bind `127.0.0.1:0`, serve the fixture app in the background, and return
/// the bound address.
pub async fn spawn(state: FixtureState) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });
    Ok(addr)
}

/// Install a compact tracing subscriber for manual debugging; a no-op when
/// one is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .try_init();
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let map = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or("<binary>").to_string(),
            )
        })
        .collect();
    Json(map)
}

async fn config(State(state): State<FixtureState>) -> (StatusCode, String) {
    state.config_hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, r#"{"feature":"live"}"#.to_string())
}

async fn protected(headers: HeaderMap) -> (StatusCode, &'static str) {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {VALID_TOKEN}"))
        .unwrap_or(false);
    if authorized {
        (StatusCode::OK, "granted")
    } else {
        (StatusCode::UNAUTHORIZED, "token expired")
    }
}

async fn flaky(State(state): State<FixtureState>) -> (StatusCode, &'static str) {
    let hit = state.flaky_hits.fetch_add(1, Ordering::SeqCst);
    if hit < 2 {
        (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
    } else {
        (StatusCode::OK, "recovered")
    }
}

async fn slow(State(state): State<FixtureState>) -> (StatusCode, &'static str) {
    state.slow_hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(10)).await;
    (StatusCode::OK, "finally")
}

async fn echo_body(body: Bytes) -> Bytes {
    body
}
