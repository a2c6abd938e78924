//! HTTP surface of the relay.
//!
//! Three routes: the chat relay itself, a liveness probe, and the metrics
//! snapshot. The chat route always answers HTTP 200 with a chat-shaped
//! payload — upstream failures surface in the reply text, the logs, and
//! the counters, never in the status line. CORS is permissive because the
//! browser front-end calls this API cross-origin.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::api::{RelayReply, RelayRequest};
use crate::core::dispatch::Dispatcher;
use crate::core::metrics;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .route("/metrics", get(metrics_snapshot))
        .layer(CorsLayer::permissive())
        .with_state(AppState { dispatcher })
}

pub async fn serve(
    port: u16,
    dispatcher: Arc<Dispatcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(dispatcher);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<RelayRequest>,
) -> Json<RelayReply> {
    let started_at = Instant::now();
    let outcome = state
        .dispatcher
        .dispatch(&request.mode, &request.prompt)
        .await;
    info!(
        mode = outcome.mode.mode.as_str(),
        defaulted = outcome.mode.defaulted,
        status = outcome.status.as_str(),
        took_ms = started_at.elapsed().as_millis() as u64,
        "dispatched chat request"
    );
    Json(RelayReply {
        reply: outcome.reply,
    })
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_snapshot() -> String {
    metrics::snapshot().render()
}
