//! Wire types for the chat/completions API

use serde::{Deserialize, Serialize};

use crate::transcript::{Message, Role};

/// One `{role, content}` pair in the outbound payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Per-request sampling settings
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub model: String,
    pub temperature: f32,
    /// `-1` means unbounded
    pub max_tokens: i64,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            model: crate::constants::ai::DEFAULT_MODEL.to_string(),
            temperature: crate::constants::ai::DEFAULT_TEMPERATURE,
            max_tokens: crate::constants::ai::UNBOUNDED_MAX_TOKENS,
        }
    }
}

/// Body of a streaming chat/completions request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f32,
    pub max_tokens: i64,
    /// Always true; this client only consumes streamed replies
    pub stream: bool,
}

impl ChatRequest {
    /// Build a streaming request from the sendable records of a transcript
    pub fn from_transcript(messages: &[Message], options: &RequestOptions) -> Self {
        Self {
            model: options.model.clone(),
            messages: messages
                .iter()
                .filter(|m| m.is_sendable())
                .map(WireMessage::from)
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: true,
        }
    }
}

/// Streaming envelope: `{"choices":[{"delta":{"content":"..."}}]}`
#[derive(Debug, Deserialize)]
pub struct ChunkEnvelope {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChunkEnvelope {
    /// `choices[0].delta.content`, if present and non-empty
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
    }
}
