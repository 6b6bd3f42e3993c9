//! Providers for locally hosted open-weight models.
//!
//! Model execution lives in a separate inference server reachable over HTTP;
//! these providers own prompt formatting, sampling limits, admission and the
//! hand-off of streamed tokens to the caller.

mod client;
mod template;
mod types;

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio::sync::{mpsc, Semaphore};

pub use client::CompletionClient;
pub use template::PromptTemplate;
pub use types::CompletionRequest;

use crate::provider::ensure_messages;
use crate::{Error, Generation, GenerationParams, GenerationStream, LLMProvider, Message};

/// Generation events buffered between the producer task and the consumer.
const TOKEN_BUFFER: usize = 64;

/// Model family served by a [`LocalModelProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Qwen3,
    Gemma3,
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Qwen3 => "qwen3",
            ModelFamily::Gemma3 => "gemma3",
        }
    }

    pub fn template(&self) -> PromptTemplate {
        match self {
            ModelFamily::Qwen3 => PromptTemplate::ChatMl,
            ModelFamily::Gemma3 => PromptTemplate::Gemma,
        }
    }

    /// Ceiling on generated tokens for this family.
    pub fn max_tokens(&self) -> u32 {
        match self {
            ModelFamily::Qwen3 => 16384,
            ModelFamily::Gemma3 => 8192,
        }
    }
}

/// A provider backed by a model loaded in a local inference server.
///
/// At most `max_concurrency` generations run at once; further callers wait for
/// a slot. A slot is held until the generation stream is finished or dropped.
pub struct LocalModelProvider {
    family: ModelFamily,
    model: String,
    client: CompletionClient,
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for LocalModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalModelProvider")
            .field("family", &self.family)
            .field("model", &self.model)
            .field("base_url", &self.client.base_url())
            .finish()
    }
}

impl LocalModelProvider {
    /// Connect to the inference server at `base_url` and check it serves `model`.
    pub async fn connect(
        family: ModelFamily,
        model: impl Into<String>,
        base_url: &str,
        max_concurrency: usize,
    ) -> Result<Self, Error> {
        let model = model.into();
        let init_error = |message: String| Error::backend_init(family.name(), message);

        let client = CompletionClient::new(base_url, family.name())
            .map_err(|e| init_error(e.to_string()))?;
        let served = client
            .list_models()
            .await
            .map_err(|e| {
                init_error(format!("inference server at {base_url} is unavailable: {e}"))
            })?;

        if !served.iter().any(|id| id == &model) {
            return Err(init_error(format!(
                "model {model} is not loaded by {base_url} (serving: {})",
                served.join(", ")
            )));
        }

        tracing::info!(
            provider = family.name(),
            model = %model,
            base_url,
            max_concurrency,
            "connected to local inference server"
        );

        Ok(Self {
            family,
            model,
            client,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    fn completion_request(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> CompletionRequest {
        let template = self.family.template();
        CompletionRequest {
            model: self.model.clone(),
            prompt: template.render(messages),
            max_tokens: params.effective_max_tokens(self.family.max_tokens()),
            // No temperature means greedy decoding.
            temperature: params.temperature().unwrap_or(0.0),
            stream: true,
            stop: template.stop_sequences(),
        }
    }
}

#[async_trait::async_trait]
impl LLMProvider for LocalModelProvider {
    fn name(&self) -> &str {
        self.family.name()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.family.max_tokens()
    }

    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<Generation, Error> {
        self.generate_stream(messages, params).await?.buffer().await
    }

    async fn generate_stream(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<GenerationStream, Error> {
        ensure_messages(messages)?;
        let request = self.completion_request(messages, params);

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::backend(self.family.name(), "provider is shut down"))?;
        let mut events = self.client.stream_completion(&request).await?;

        let (tx, rx) = mpsc::channel(TOKEN_BUFFER);
        let provider = self.family.name();

        tokio::spawn(async move {
            let _permit = permit;
            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        tracing::debug!(provider, "stream consumer dropped, abandoning generation");
                        break;
                    }
                    next = events.next() => match next {
                        Some(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        });

        let received = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(GenerationStream::from_stream(received))
    }
}
