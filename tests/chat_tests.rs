//! End-to-end tests for `POST /chat` against a scripted provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tokio::sync::mpsc;
use tower::ServiceExt;

use chat_gateway::config::Config;
use chat_gateway::metrics::Metrics;
use chat_gateway::server::{build_router, AppState};
use chat_gateway::upstream::events::ContentDelta;
use chat_gateway::upstream::{ChatProvider, ChatRequest, ProviderError, StreamEvent};

const ERROR_RECORD: &str = "data: {\"message\": \"Internal Server Error\"}\nevent: error\n\n";

/// Replays fixed events, then returns a fixed result.
struct ScriptedProvider {
    events: Vec<StreamEvent>,
    fail: Option<String>,
    seen: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn new(events: Vec<StreamEvent>, fail: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            events,
            fail: fail.map(str::to_string),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat_stream(
        &self,
        request: ChatRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        self.seen.lock().unwrap().push(request);
        for event in self.events.clone() {
            if events.send(event).await.is_err() {
                return Ok(());
            }
        }
        match &self.fail {
            Some(msg) => Err(ProviderError::Stream(msg.clone())),
            None => Ok(()),
        }
    }
}

fn app(provider: Arc<ScriptedProvider>) -> Router {
    let state = Arc::new(AppState::new(
        provider,
        Arc::new(Config::default()),
        Metrics::new().unwrap(),
    ));
    build_router(state)
}

fn text_delta(text: &str) -> StreamEvent {
    StreamEvent::ContentBlockDelta {
        index: 0,
        delta: ContentDelta::TextDelta {
            text: text.to_string(),
        },
    }
}

fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_streams_provider_events_in_order() {
    let provider = ScriptedProvider::new(
        vec![text_delta("Hel"), text_delta("lo"), StreamEvent::MessageStop],
        None,
    );
    let response = app(provider.clone())
        .oneshot(chat_request(r#"{"message": "hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers[header::CONNECTION], "keep-alive");

    let body = body_text(response).await;
    assert_eq!(
        body,
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n\
         data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n\
         data: {\"type\":\"message_stop\"}\n\n"
    );

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let expected = ChatRequest::single_user("claude-3-haiku-20240307", "hi", 1054);
    assert_eq!(seen[0], expected);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let provider = ScriptedProvider::new(vec![StreamEvent::Ping], None);
    let response = app(provider.clone())
        .oneshot(chat_request("{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_text(response).await, "Bad Request");
    assert!(provider.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_object_forwards_empty_message() {
    let provider = ScriptedProvider::new(vec![], None);
    let response = app(provider.clone())
        .oneshot(chat_request("{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], ChatRequest::single_user("claude-3-haiku-20240307", "", 1054));
}

#[tokio::test]
async fn test_upstream_failure_without_events() {
    let provider = ScriptedProvider::new(vec![], Some("connection reset"));
    let response = app(provider)
        .oneshot(chat_request(r#"{"message": "hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, ERROR_RECORD);
}

#[tokio::test]
async fn test_upstream_failure_after_events() {
    let provider = ScriptedProvider::new(vec![StreamEvent::Ping], Some("overloaded"));
    let response = app(provider)
        .oneshot(chat_request(r#"{"message": "hi"}"#))
        .await
        .unwrap();

    let body = body_text(response).await;
    assert_eq!(body, format!("data: {{\"type\":\"ping\"}}\n\n{ERROR_RECORD}"));
}

#[tokio::test]
async fn test_health_and_metrics() {
    let provider = ScriptedProvider::new(vec![StreamEvent::Ping], None);
    let router = app(provider);

    let response = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "ok");

    let response = router
        .clone()
        .oneshot(chat_request("nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(text.contains("chat_requests_total 1"));
    assert!(text.contains("chat_bad_requests_total 1"));
}

#[tokio::test]
async fn test_cors_preflight() {
    let provider = ScriptedProvider::new(vec![], None);
    let response = app(provider)
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/chat")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_static_assets_fall_back_to_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>chat</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

    let mut config = Config::default();
    config.server.static_dir = Some(dir.path().to_path_buf());
    let state = Arc::new(AppState::new(
        ScriptedProvider::new(vec![], None),
        Arc::new(config),
        Metrics::new().unwrap(),
    ));
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(Request::get("/conversations/1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate, max-age=0"
    );
    assert_eq!(body_text(response).await, "<html>chat</html>");

    let response = router
        .oneshot(Request::get("/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    assert_eq!(body_text(response).await, "console.log(1)");
}
