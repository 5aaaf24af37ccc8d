//! Anthropic Messages API streaming client.
//!
//! Sends `POST {base_url}/v1/messages` with `stream: true` and decodes the
//! SSE response body into [`StreamEvent`]s.

use std::pin::pin;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::upstream::{ChatProvider, ChatRequest, ProviderError, StreamEvent};

/// Request body: the chat request plus the streaming flag.
#[derive(Serialize)]
struct MessagesBody<'a> {
    #[serde(flatten)]
    request: &'a ChatRequest,
    stream: bool,
}

/// Shared, immutable Anthropic client.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    version: String,
}

impl AnthropicClient {
    /// Create a client from provider settings and a credential.
    pub fn new(config: &ProviderConfig, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            version: config.anthropic_version.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl ChatProvider for AnthropicClient {
    async fn chat_stream(
        &self,
        request: ChatRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .json(&MessagesBody {
                request: &request,
                stream: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = pin!(response.bytes_stream().eventsource());
        let mut forwarded = 0usize;

        while let Some(item) = stream.next().await {
            let raw = item.map_err(|e| ProviderError::Stream(e.to_string()))?;

            if !StreamEvent::is_known_type(&raw.event) {
                debug!(event_type = %raw.event, "Skipping unknown upstream event");
                continue;
            }

            let event: StreamEvent =
                serde_json::from_str(&raw.data).map_err(|source| ProviderError::Decode {
                    event: raw.event.clone(),
                    source,
                })?;

            if event.has_unknown_content() {
                debug!(event_type = %raw.event, "Skipping event with unknown content type");
                continue;
            }

            if let StreamEvent::Error { error } = event {
                warn!(kind = %error.kind, "Provider reported an error mid-stream");
                return Err(ProviderError::Api {
                    kind: error.kind,
                    message: error.message,
                });
            }

            let done = matches!(event, StreamEvent::MessageStop);
            if events.send(event).await.is_err() {
                debug!(forwarded, "Event receiver dropped, abandoning upstream stream");
                return Ok(());
            }
            forwarded += 1;

            if done {
                break;
            }
        }

        debug!(forwarded, "Upstream stream finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_includes_stream_flag() {
        let request = ChatRequest::single_user("m", "hi", 16);
        let body = serde_json::to_value(MessagesBody {
            request: &request,
            stream: true,
        })
        .unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 16);
        assert_eq!(body["messages"][0]["content"][0]["text"], "hi");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = ProviderConfig {
            base_url: "http://localhost:9999/".to_string(),
            ..ProviderConfig::default()
        };
        let client = AnthropicClient::new(&config, "key").unwrap();
        assert_eq!(client.messages_url(), "http://localhost:9999/v1/messages");
    }
}
