//! Streamed generation output.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::stream::{self, Stream, StreamExt};

use crate::accumulator::GenerationAccumulator;
use crate::{Error, FinishReason, Generation, GenerationEvent};

type EventStream = Pin<Box<dyn Stream<Item = Result<GenerationEvent, Error>> + Send>>;

/// Token stream returned by [`LLMProvider::generate_stream`](crate::LLMProvider::generate_stream).
///
/// Wraps a raw backend stream and normalizes it: empty deltas are dropped,
/// nothing is yielded after the first `Done` or error, and a backend that
/// simply stops gets a synthesized `Done(stop)`. The inner stream is dropped as
/// soon as the output is finished so any producer behind it is released.
pub struct GenerationStream {
    inner: EventStream,
    finished: bool,
}

impl GenerationStream {
    /// Create a generation stream from raw backend events.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<GenerationEvent, Error>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            finished: false,
        }
    }

    /// Create a generation stream from an already known sequence of events.
    pub fn from_events(events: Vec<GenerationEvent>) -> Self {
        Self::from_stream(stream::iter(events.into_iter().map(Ok)))
    }

    /// Consume the stream and assemble the complete result.
    pub async fn buffer(mut self) -> Result<Generation, Error> {
        let mut accumulator = GenerationAccumulator::new();

        while let Some(event) = self.next().await {
            accumulator.process_event(event?)?;
        }

        accumulator.finalize()
    }

    fn finish(&mut self) {
        self.finished = true;
        self.inner = Box::pin(stream::empty());
    }
}

impl Stream for GenerationStream {
    type Item = Result<GenerationEvent, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(GenerationEvent::Delta { text })) if text.is_empty() => continue,
                Some(Ok(event)) => {
                    if event.is_final() {
                        this.finish();
                    }
                    return Poll::Ready(Some(Ok(event)));
                }
                Some(Err(e)) => {
                    this.finish();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.finish();
                    return Poll::Ready(Some(Ok(GenerationEvent::done(FinishReason::Stop))));
                }
            }
        }
    }
}
