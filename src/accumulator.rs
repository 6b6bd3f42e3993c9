//! Folds streamed generation events into a complete result.

use crate::{Error, FinishReason, Generation, GenerationEvent};

/// Accumulates generation events into a [`Generation`].
#[derive(Debug, Default)]
pub struct GenerationAccumulator {
    content: String,
    finish_reason: Option<FinishReason>,
}

impl GenerationAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Events after `Done` are a protocol violation.
    pub fn process_event(&mut self, event: GenerationEvent) -> Result<(), Error> {
        if self.finish_reason.is_some() {
            return Err(Error::streaming("received event after end of generation"));
        }

        match event {
            GenerationEvent::Delta { text } => self.content.push_str(&text),
            GenerationEvent::Done { finish_reason } => self.finish_reason = Some(finish_reason),
        }

        Ok(())
    }

    /// Whether the terminal event has been applied.
    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// Text accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Finish accumulation. Fails if the terminal event was never seen.
    pub fn finalize(self) -> Result<Generation, Error> {
        let finish_reason = self
            .finish_reason
            .ok_or_else(|| Error::streaming("generation ended without a finish reason"))?;

        Ok(Generation {
            content: self.content,
            finish_reason,
        })
    }
}
