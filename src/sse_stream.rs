//! Stream adapter that decodes server-sent events from a byte stream.
//!
//! Used to read the streamed completions of a local inference server.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Stream, StreamExt};
use memchr::memmem;

use crate::Error;

/// Largest amount of undelimited data buffered before giving up.
const MAX_BUFFER: usize = 1_000_000;

/// Terminal sentinel used by OpenAI-compatible servers.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A decoded server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// The `event:` field, when present.
    pub event_type: Option<String>,
    /// All `data:` lines of the event joined with newlines.
    pub data: String,
}

impl SseEvent {
    /// Whether this is the `[DONE]` end-of-stream marker.
    pub fn is_done(&self) -> bool {
        self.data.trim() == DONE_SENTINEL
    }

    fn parse(block: &str) -> Option<Self> {
        let mut event_type = None;
        let mut data_lines = Vec::new();

        for line in block.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);

            match field {
                "event" => event_type = Some(value.to_string()),
                "data" => data_lines.push(value),
                _ => {}
            }
        }

        if data_lines.is_empty() {
            return None;
        }

        Some(Self {
            event_type,
            data: data_lines.join("\n"),
        })
    }
}

/// Decodes SSE events out of raw byte chunks, tolerating events and UTF-8
/// sequences split across chunk boundaries.
pub struct SseStream<S> {
    inner: S,
    buffer: Vec<u8>,
    events: VecDeque<SseEvent>,
}

impl<S> SseStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            events: VecDeque::new(),
        }
    }

    fn drain_complete_events(&mut self) -> Result<(), Error> {
        normalize_line_endings(&mut self.buffer);

        let finder = memmem::Finder::new(b"\n\n");
        let mut start = 0;

        while let Some(pos) = finder.find(&self.buffer[start..]) {
            let end = start + pos;
            let block = std::str::from_utf8(&self.buffer[start..end])
                .map_err(|e| Error::streaming(format!("Invalid UTF-8 in SSE event: {e}")))?;

            if let Some(event) = SseEvent::parse(block) {
                self.events.push_back(event);
            }
            start = end + 2;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        Ok(())
    }

    fn take_trailing_event(&mut self) -> Option<SseEvent> {
        let event = std::str::from_utf8(&self.buffer)
            .ok()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .and_then(SseEvent::parse);
        self.buffer.clear();
        event
    }
}

/// Rewrite `\r\n` as `\n` in place so a single separator search suffices.
fn normalize_line_endings(buffer: &mut Vec<u8>) {
    if memchr::memchr(b'\r', buffer).is_some() {
        let mut normalized = Vec::with_capacity(buffer.len());
        let mut bytes = buffer.iter().peekable();
        while let Some(&b) = bytes.next() {
            if b == b'\r' && bytes.peek() == Some(&&b'\n') {
                continue;
            }
            normalized.push(b);
        }
        *buffer = normalized;
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<SseEvent, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            let chunk = match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    return Poll::Ready(Some(Err(Error::streaming(format!(
                        "Stream error: {e}"
                    )))));
                }
                // Servers may close without the final blank line.
                None => return Poll::Ready(self.take_trailing_event().map(Ok)),
            };

            self.buffer.extend_from_slice(&chunk);
            if self.buffer.len() > MAX_BUFFER {
                self.buffer.clear();
                return Poll::Ready(Some(Err(Error::streaming(
                    "SSE buffer exceeded maximum size",
                ))));
            }

            if let Err(e) = self.drain_complete_events() {
                return Poll::Ready(Some(Err(e)));
            }
        }
    }
}

/// Extension trait to add SSE decoding to byte streams.
pub trait SseStreamExt: Stream {
    fn sse_events(self) -> SseStream<Self>
    where
        Self: Sized,
    {
        SseStream::new(self)
    }
}

impl<S: Stream> SseStreamExt for S {}
