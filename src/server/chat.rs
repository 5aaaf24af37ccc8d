//! `POST /chat`: decode one message and stream the provider's reply.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::server::relay::{stream_chat, RelayOutcome};
use crate::server::AppState;
use crate::sse;
use crate::upstream::ChatRequest;

/// Inbound chat body. A missing `message` decodes as an empty string.
#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    #[serde(default)]
    pub message: String,
}

pub async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4().to_string();
    state.metrics.chat_requests.inc();

    let req: ChatMessageRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Unable to parse request body");
            state.metrics.bad_requests.inc();
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    let provider_config = &state.config.provider;
    info!(
        request_id = %request_id,
        model = %provider_config.model,
        message_len = req.message.len(),
        "Chat request"
    );

    let upstream_request =
        ChatRequest::single_user(&provider_config.model, req.message, provider_config.max_tokens);

    let buffer = state.config.server.event_buffer;
    let (mut writer, body_stream) = sse::channel(buffer);
    let provider = state.provider.clone();
    let metrics = state.metrics.clone();

    tokio::spawn(
        async move {
            let client_gone = writer.closed();
            let outcome =
                stream_chat(provider, upstream_request, &mut writer, buffer, client_gone).await;
            if !matches!(outcome, RelayOutcome::Disconnected(_)) {
                if let Err(e) = writer.shutdown().await {
                    debug!(error = %e, "Unable to close SSE stream");
                }
            }
            metrics.record(&outcome);

            let stats = outcome.stats();
            info!(
                relayed = stats.relayed,
                error_events = stats.error_events,
                outcome = ?outcome,
                "Chat stream finished"
            );
        }
        .instrument(info_span!("chat_stream", request_id = %request_id)),
    );

    (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
        ],
        Body::from_stream(body_stream),
    )
        .into_response()
}
