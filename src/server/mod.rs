//! HTTP server for the chat gateway.
//!
//! - [`chat`]: `POST /chat`, the streaming endpoint
//! - [`relay`]: provider → SSE bridge driven per request
//! - [`assets`]: optional static UI

pub mod assets;
pub mod chat;
pub mod relay;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::upstream::ChatProvider;

/// Application state shared across handlers. Immutable after startup.
pub struct AppState {
    pub provider: Arc<dyn ChatProvider>,
    pub config: Arc<Config>,
    pub metrics: Metrics,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(provider: Arc<dyn ChatProvider>, config: Arc<Config>, metrics: Metrics) -> Self {
        Self {
            provider,
            config,
            metrics,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE]);

    let static_dir = state.config.server.static_dir.clone();

    let mut router = Router::new()
        .route("/chat", post(chat::chat))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state);

    if let Some(dir) = static_dir {
        router = router.merge(assets::router(&dir));
    }

    router.layer(cors).layer(TraceLayer::new_for_http())
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub model: String,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        model: state.config.provider.model.clone(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Unable to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
