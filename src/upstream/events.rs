//! Provider stream events.
//!
//! The variants mirror the Anthropic Messages streaming protocol, and the
//! serialized form is the provider's own JSON so browser clients can parse
//! relayed events unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event of an upstream generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Generation started; carries the (empty) assistant message.
    MessageStart { message: MessageInfo },

    /// A content block opened at `index`.
    ContentBlockStart {
        index: u32,
        content_block: ContentBlock,
    },

    /// Incremental content for the block at `index`.
    ContentBlockDelta { index: u32, delta: ContentDelta },

    ContentBlockStop { index: u32 },

    /// Top-level message changes (stop reason, usage).
    MessageDelta {
        delta: MessageDeltaInfo,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },

    /// Generation finished.
    MessageStop,

    Ping,

    /// Provider-side failure reported in-band.
    Error { error: ApiError },
}

impl StreamEvent {
    /// Event names this crate understands, as sent in the upstream `event:` line.
    pub const KNOWN_TYPES: [&'static str; 8] = [
        "message_start",
        "content_block_start",
        "content_block_delta",
        "content_block_stop",
        "message_delta",
        "message_stop",
        "ping",
        "error",
    ];

    pub fn is_known_type(name: &str) -> bool {
        Self::KNOWN_TYPES.contains(&name)
    }

    /// The `type` tag of this event.
    pub fn type_name(&self) -> &'static str {
        match self {
            StreamEvent::MessageStart { .. } => "message_start",
            StreamEvent::ContentBlockStart { .. } => "content_block_start",
            StreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            StreamEvent::ContentBlockStop { .. } => "content_block_stop",
            StreamEvent::MessageDelta { .. } => "message_delta",
            StreamEvent::MessageStop => "message_stop",
            StreamEvent::Ping => "ping",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Whether this event carries a content block or delta type this crate
    /// does not model. Such events cannot be relayed faithfully.
    pub fn has_unknown_content(&self) -> bool {
        matches!(
            self,
            StreamEvent::ContentBlockStart {
                content_block: ContentBlock::Unknown,
                ..
            } | StreamEvent::ContentBlockDelta {
                delta: ContentDelta::Unknown,
                ..
            }
        )
    }

    /// Text carried by a text delta, if any.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta { text },
                ..
            } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    #[serde(rename = "type", default = "default_message_type")]
    pub kind: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

fn default_message_type() -> String {
    "message".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    /// Any block type not listed above (e.g. `thinking`).
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    /// Any delta type not listed above (e.g. `thinking_delta`).
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageDeltaInfo {
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
}

/// Token accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}
