//! Chat completion orchestration on top of a provider.

use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use uuid::Uuid;

use crate::{
    ChatCompletionChunkResponse, ChatCompletionRequest, ChatCompletionResponse, Choice,
    ChoiceChunk, Delta, Error, GenerationEvent, LLMProvider, Message, Role,
};

/// Stream of chunks making up one streamed completion.
pub type ChunkStream = BoxStream<'static, Result<ChatCompletionChunkResponse, Error>>;

/// Turns chat completion requests into responses using a provider.
///
/// Holds no per-request state; cloning shares the provider.
#[derive(Clone)]
pub struct ChatService {
    provider: Arc<dyn LLMProvider>,
}

impl ChatService {
    /// Serve completions from `provider`.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// The provider generating replies.
    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    /// Generate a complete response.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, Error> {
        let params = request.validate()?;
        let generation = self.provider.generate(&request.messages, &params).await?;

        let response = ChatCompletionResponse::new(
            new_completion_id(),
            request.model.clone(),
            vec![Choice {
                index: 0,
                message: Message::assistant_reply(generation.content),
                finish_reason: generation.finish_reason,
            }],
        );

        tracing::debug!(
            id = %response.id,
            model = %response.model,
            finish_reason = generation.finish_reason.as_str(),
            "chat completion finished"
        );
        Ok(response)
    }

    /// Generate a response as a stream of chunks sharing one id.
    ///
    /// Every content chunk carries `role: assistant`; the last chunk carries no
    /// role, empty content and the finish reason.
    pub async fn complete_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChunkStream, Error> {
        let params = request.validate()?;
        let events = self
            .provider
            .generate_stream(&request.messages, &params)
            .await?;

        let id = new_completion_id();
        let model = request.model.clone();
        tracing::debug!(id = %id, model = %model, "chat completion stream started");

        let chunks = events.map(move |event| {
            event.map(|event| {
                ChatCompletionChunkResponse::new(id.clone(), model.clone(), choice_chunk(event))
            })
        });

        Ok(chunks.boxed())
    }
}

fn choice_chunk(event: GenerationEvent) -> ChoiceChunk {
    match event {
        GenerationEvent::Delta { text } => ChoiceChunk {
            index: 0,
            delta: Delta {
                role: Some(Role::Assistant),
                content: Some(text),
            },
            finish_reason: None,
        },
        GenerationEvent::Done { finish_reason } => ChoiceChunk {
            index: 0,
            delta: Delta {
                role: None,
                content: Some(String::new()),
            },
            finish_reason: Some(finish_reason),
        },
    }
}

fn new_completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4())
}
