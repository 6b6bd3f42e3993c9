//! OpenAI-compatible chat completion wire types.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::generation::{FinishReason, GenerationParams};
use super::message::{Message, Role};
use crate::Error;

pub const CHAT_COMPLETION_OBJECT: &str = "chat.completion";
pub const CHAT_COMPLETION_CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Request body for creating a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// ID of the model to use.
    pub model: String,
    /// The conversation so far, oldest first.
    pub messages: Vec<Message>,
    /// Stream partial message deltas as server-sent events.
    #[serde(default)]
    pub stream: bool,
    /// Sampling temperature between 0 and 2; greedy decoding when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens, clamped to the provider's ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatCompletionRequest {
    /// Create a non-streaming request with default sampling.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set whether the reply is streamed.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generated token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Check the request and extract its sampling parameters.
    pub fn validate(&self) -> Result<GenerationParams, Error> {
        if self.messages.is_empty() {
            return Err(Error::invalid_input("messages must contain at least one message"));
        }
        GenerationParams::new(self.temperature, self.max_tokens)
    }
}

/// A chat completion choice generated by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    /// The assistant's reply.
    pub message: Message,
    pub finish_reason: FinishReason,
}

/// A complete (non-streaming) chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Unique identifier of the completion.
    pub id: String,
    /// Always `chat.completion`.
    pub object: String,
    /// Unix timestamp in seconds.
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
}

impl ChatCompletionResponse {
    /// Create a response stamped with the current time.
    pub fn new(id: String, model: String, choices: Vec<Choice>) -> Self {
        Self {
            id,
            object: CHAT_COMPLETION_OBJECT.to_string(),
            created: unix_timestamp(),
            model,
            choices,
        }
    }
}

/// Incremental fields of one streamed chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Delta {
    /// `assistant` on content chunks, null on the terminal chunk.
    pub role: Option<Role>,
    /// The text fragment; empty on the terminal chunk.
    pub content: Option<String>,
}

/// A choice within a streamed chunk. `finish_reason` is null except on the last chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceChunk {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<FinishReason>,
}

/// One chunk of a streamed chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunkResponse {
    /// Shared by every chunk of one stream.
    pub id: String,
    /// Always `chat.completion.chunk`.
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChoiceChunk>,
}

impl ChatCompletionChunkResponse {
    /// Create a single-choice chunk stamped with the current time.
    pub fn new(id: String, model: String, choice: ChoiceChunk) -> Self {
        Self {
            id,
            object: CHAT_COMPLETION_CHUNK_OBJECT.to_string(),
            created: unix_timestamp(),
            model,
            choices: vec![choice],
        }
    }

    /// Whether this is the terminal chunk of its stream.
    pub fn is_final(&self) -> bool {
        self.choices.iter().any(|c| c.finish_reason.is_some())
    }
}

pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
