use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::Client;

use super::types::{CompletionChunk, CompletionRequest, ErrorBody, ModelList};
use crate::sse_stream::SseStreamExt;
use crate::{Error, FinishReason, GenerationEvent};

/// HTTP client for an OpenAI-compatible text completion server.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: Client,
    base_url: String,
    provider: &'static str,
}

impl CompletionClient {
    pub fn new(base_url: impl Into<String>, provider: &'static str) -> Result<Self, Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Identifiers of the models the server has loaded.
    pub async fn list_models(&self) -> Result<Vec<String>, Error> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::backend(
                self.provider,
                format!("model listing failed with {status}: {body}"),
            ));
        }

        let models: ModelList = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    /// Start a streamed completion and return its raw generation events.
    ///
    /// Connection and status failures are reported here; failures after the
    /// first byte arrive as stream items.
    pub async fn stream_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<GenerationEvent, Error>>, Error> {
        let response = self
            .client
            .post(format!("{}/v1/completions", self.base_url))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Error::backend(
                self.provider,
                format!("completion failed with {status}: {message}"),
            ));
        }

        let provider = self.provider;
        let events = response
            .bytes_stream()
            .sse_events()
            .take_while(|result| future::ready(!matches!(result, Ok(event) if event.is_done())))
            .map(move |result| match result {
                Ok(event) => parse_chunk(provider, &event.data),
                Err(e) => vec![Err(e)],
            })
            .flat_map(stream::iter)
            .boxed();

        Ok(events)
    }
}

/// Convert one streamed JSON payload into generation events.
///
/// An `{"error": ...}` payload is checked first, since it would otherwise
/// parse as a chunk without choices.
fn parse_chunk(provider: &str, data: &str) -> Vec<Result<GenerationEvent, Error>> {
    if let Ok(body) = serde_json::from_str::<ErrorBody>(data) {
        return vec![Err(Error::backend(provider, body.error.message))];
    }

    let chunk = match serde_json::from_str::<CompletionChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => return vec![Err(Error::Serialization(e))],
    };

    let mut events = Vec::new();
    for choice in chunk.choices {
        events.push(Ok(GenerationEvent::delta(choice.text)));
        if let Some(reason) = choice.finish_reason {
            events.push(Ok(GenerationEvent::done(FinishReason::from_backend(&reason))));
        }
    }
    events
}
