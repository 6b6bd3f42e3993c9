use crate::{Error, GenerationParams, Generation, GenerationStream, Message};

/// A trait for generation backends.
///
/// One instance is shared by every concurrent request, so implementations that
/// wrap a single execution context must serialize access themselves.
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync + 'static {
    /// Provider name as used in configuration (e.g. `"mock"`).
    fn name(&self) -> &str;

    /// Model identifier this provider serves.
    fn model(&self) -> &str;

    /// The provider's own ceiling on generated tokens.
    fn max_tokens(&self) -> u32;

    /// Generate one complete reply to `messages`.
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<Generation, Error>;

    /// Generate a reply incrementally.
    ///
    /// The returned stream never yields empty deltas and ends with exactly one
    /// [`GenerationEvent::Done`](crate::GenerationEvent::Done).
    async fn generate_stream(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<GenerationStream, Error>;
}

/// Reject an empty conversation.
pub(crate) fn ensure_messages(messages: &[Message]) -> Result<(), Error> {
    if messages.is_empty() {
        return Err(Error::invalid_input("messages must not be empty"));
    }
    Ok(())
}
