//! Types exchanged between the chat service and generation providers.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Upper bound accepted for `temperature`.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Reason why generation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
        }
    }

    /// Map a backend's finish reason string, defaulting to `Stop`.
    pub fn from_backend(reason: &str) -> Self {
        match reason {
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

/// Validated sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GenerationParams {
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl GenerationParams {
    /// Build parameters, rejecting a temperature outside `[0.0, 2.0]` or a zero token limit.
    pub fn new(temperature: Option<f32>, max_tokens: Option<u32>) -> Result<Self, Error> {
        if let Some(t) = temperature {
            if !(0.0..=MAX_TEMPERATURE).contains(&t) {
                return Err(Error::invalid_input(format!(
                    "temperature must be between 0.0 and {MAX_TEMPERATURE}, got {t}"
                )));
            }
        }
        if max_tokens == Some(0) {
            return Err(Error::invalid_input("max_tokens must be greater than 0"));
        }
        Ok(Self {
            temperature,
            max_tokens,
        })
    }

    /// Greedy decoding with the provider's own length ceiling.
    pub fn greedy() -> Self {
        Self::default()
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// Token limit a provider should honour: the request, clamped to `ceiling`.
    pub fn effective_max_tokens(&self, ceiling: u32) -> u32 {
        self.max_tokens.map_or(ceiling, |requested| requested.min(ceiling))
    }
}

/// A complete result from a provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Generation {
    pub content: String,
    pub finish_reason: FinishReason,
}

/// Events emitted by a provider while streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// A fragment of generated text. Empty fragments carry no information.
    Delta { text: String },
    /// Generation has finished. Always the last event of a stream.
    Done { finish_reason: FinishReason },
}

impl GenerationEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        GenerationEvent::Delta { text: text.into() }
    }

    pub fn done(finish_reason: FinishReason) -> Self {
        GenerationEvent::Done { finish_reason }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, GenerationEvent::Done { .. })
    }
}
