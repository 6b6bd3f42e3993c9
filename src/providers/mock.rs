//! Mock provider for tests and local development.
//!
//! Composes a reply from a small fixed vocabulary instead of running a model,
//! echoing the start of the latest user message.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::provider::ensure_messages;
use crate::{
    Error, FinishReason, Generation, GenerationEvent, GenerationParams, GenerationStream,
    LLMProvider, Message, Role,
};

/// Model identifier served by the mock provider.
pub const MOCK_MODEL: &str = "mock";

/// Length ceiling of the mock provider, counted in characters.
pub const MOCK_MAX_TOKENS: u32 = 4096;

const OPENERS: [&str; 4] = [
    "Hello!",
    "How are you doing?",
    "Thanks for your question!",
    "I see, that's interesting.",
];

const BODIES: [&str; 4] = [
    "Let's think about that together.",
    "That's a really important topic.",
    "There are a few points worth covering here.",
    "What a great question.",
];

const CLOSERS: [&str; 4] = [
    "Feel free to ask if you have any other questions!",
    "I hope this helps.",
    "Let me know if anything else comes up.",
    "I'm happy to keep helping!",
];

const NO_USER_BODY: &str = "Is there anything I can help you with?";

const SUMMARY_CHARS: usize = 20;

/// A provider that fabricates replies without calling any model.
///
/// Output depends only on the conversation and the sampling parameters, so the
/// streaming and non-streaming paths always agree on the final text.
#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
    stream_delay: Duration,
    max_tokens: u32,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            model: MOCK_MODEL.to_string(),
            stream_delay: Duration::from_millis(50),
            max_tokens: MOCK_MAX_TOKENS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Delay between streamed characters.
    pub fn with_stream_delay(mut self, delay: Duration) -> Self {
        self.stream_delay = delay;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn compose(&self, messages: &[Message], params: &GenerationParams) -> Generation {
        let mut rng = StdRng::seed_from_u64(seed(messages, params));
        let opener = OPENERS[rng.random_range(0..OPENERS.len())];
        let closer = CLOSERS[rng.random_range(0..CLOSERS.len())];

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::User)
            .map(Message::content);

        let body = match last_user {
            Some(text) => {
                let template = BODIES[rng.random_range(0..BODIES.len())];
                format!("\"{}\" {template}", summarize(text))
            }
            None => NO_USER_BODY.to_string(),
        };

        let content = format!("{opener}\n\n{body}\n\n{closer}");
        truncate(content, params.effective_max_tokens(self.max_tokens) as usize)
    }
}

/// First characters of `text`, with an ellipsis when cut.
fn summarize(text: &str) -> String {
    if text.chars().count() > SUMMARY_CHARS {
        let head: String = text.chars().take(SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn truncate(content: String, limit: usize) -> Generation {
    match content.char_indices().nth(limit) {
        Some((cut, _)) => Generation {
            content: content[..cut].to_string(),
            finish_reason: FinishReason::Length,
        },
        None => Generation {
            content,
            finish_reason: FinishReason::Stop,
        },
    }
}

fn seed(messages: &[Message], params: &GenerationParams) -> u64 {
    let mut hasher = DefaultHasher::new();
    for message in messages {
        message.role().as_str().hash(&mut hasher);
        message.content().hash(&mut hasher);
    }
    params.temperature().map(f32::to_bits).hash(&mut hasher);
    hasher.finish()
}

#[async_trait::async_trait]
impl LLMProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<Generation, Error> {
        ensure_messages(messages)?;
        Ok(self.compose(messages, params))
    }

    async fn generate_stream(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<GenerationStream, Error> {
        let Generation {
            content,
            finish_reason,
        } = self.generate(messages, params).await?;

        let delay = self.stream_delay;
        let units: Vec<String> = content.chars().map(String::from).collect();

        let deltas = stream::iter(units)
            .enumerate()
            .then(move |(i, unit)| async move {
                if i > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok::<_, Error>(GenerationEvent::delta(unit))
            });
        let done = stream::once(async move { Ok(GenerationEvent::done(finish_reason)) });

        Ok(GenerationStream::from_stream(deltas.chain(done)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MockProvider {
        MockProvider::new().with_stream_delay(Duration::ZERO)
    }

    fn conversation() -> Vec<Message> {
        vec![
            Message::system("You are a helpful assistant").unwrap(),
            Message::user("What is the capital of France?").unwrap(),
        ]
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("Hello"), "Hello");
        assert_eq!(summarize("12345678901234567890"), "12345678901234567890");
        assert_eq!(summarize("What is the capital of France?"), "What is the capital ...");
    }

    #[tokio::test]
    async fn test_echoes_latest_user_message() {
        let messages = vec![
            Message::user("first question").unwrap(),
            Message::new(Role::Assistant, "an answer").unwrap(),
            Message::user("Hello").unwrap(),
        ];
        let generation = provider()
            .generate(&messages, &GenerationParams::greedy())
            .await
            .unwrap();

        assert!(generation.content.contains("\"Hello\""));
        assert!(!generation.content.contains("first question"));
        assert_eq!(generation.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_without_user_message() {
        let messages = vec![Message::system("Be brief.").unwrap()];
        let generation = provider()
            .generate(&messages, &GenerationParams::greedy())
            .await
            .unwrap();
        assert!(generation.content.contains(NO_USER_BODY));
    }

    #[tokio::test]
    async fn test_rejects_empty_conversation() {
        let result = provider().generate(&[], &GenerationParams::greedy()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let result = provider().generate_stream(&[], &GenerationParams::greedy()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_streaming_matches_generate() {
        let provider = provider();
        let params = GenerationParams::new(Some(0.7), None).unwrap();

        let generation = provider.generate(&conversation(), &params).await.unwrap();
        let events: Vec<GenerationEvent> = provider
            .generate_stream(&conversation(), &params)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await;

        let (last, deltas) = events.split_last().unwrap();
        assert_eq!(last, &GenerationEvent::done(FinishReason::Stop));

        let mut streamed = String::new();
        for event in deltas {
            match event {
                GenerationEvent::Delta { text } => {
                    assert_eq!(text.chars().count(), 1);
                    streamed.push_str(text);
                }
                GenerationEvent::Done { .. } => panic!("Done before the end of the stream"),
            }
        }
        assert_eq!(streamed, generation.content);
    }

    #[tokio::test]
    async fn test_deterministic_for_identical_input() {
        let provider = provider();
        let params = GenerationParams::new(Some(1.3), None).unwrap();
        let a = provider.generate(&conversation(), &params).await.unwrap();
        let b = provider.generate(&conversation(), &params).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_max_tokens_truncates() {
        let params = GenerationParams::new(None, Some(5)).unwrap();
        let generation = provider().generate(&conversation(), &params).await.unwrap();
        assert_eq!(generation.content.chars().count(), 5);
        assert_eq!(generation.finish_reason, FinishReason::Length);

        let streamed = provider()
            .generate_stream(&conversation(), &params)
            .await
            .unwrap()
            .buffer()
            .await
            .unwrap();
        assert_eq!(streamed, generation);
    }

    #[tokio::test]
    async fn test_max_tokens_clamped_to_ceiling() {
        let provider = provider().with_max_tokens(3);
        let params = GenerationParams::new(None, Some(1000)).unwrap();
        let generation = provider.generate(&conversation(), &params).await.unwrap();
        assert_eq!(generation.content.chars().count(), 3);
        assert_eq!(generation.finish_reason, FinishReason::Length);
    }
}
