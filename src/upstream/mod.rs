//! Upstream language-model provider boundary.
//!
//! - [`events`]: the closed set of provider stream events relayed to clients
//! - [`anthropic`]: the Anthropic Messages API streaming client
//!
//! A provider pushes events into an `mpsc::Sender` in generation order and
//! returns when the generation ends. Dropping the sender is the end-of-events
//! signal; a closed receiver tells the provider to stop.

pub mod anthropic;
pub mod events;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

pub use events::StreamEvent;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream stream error: {0}")]
    Stream(String),

    #[error("failed to decode {event} event: {source}")]
    Decode {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("provider error ({kind}): {message}")]
    Api { kind: String, message: String },
}

/// A streaming chat-completion source.
#[async_trait]
pub trait ChatProvider: Send + Sync + 'static {
    /// Run one generation, sending every upstream event to `events` in order.
    ///
    /// Returns `Ok(())` when the generation completes or the receiver is
    /// dropped, and an error on transport or protocol failure.
    async fn chat_stream(
        &self,
        request: ChatRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError>;
}

/// Request sent upstream for one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,

    /// Conversation so far.
    pub messages: Vec<Message>,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl ChatRequest {
    /// A request holding a single user message.
    pub fn single_user(model: impl Into<String>, text: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(text)],
            max_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<Content>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![Content::Text { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
}
