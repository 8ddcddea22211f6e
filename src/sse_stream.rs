//! Stream adapter for extracting SSE `data:` payloads from upstream byte
//! chunks.
//!
//! The OpenAI-compatible backend streams `data: {json}\n\n` frames. Chat
//! completion streams never use the `event:`/`id:`/`retry:` fields, so this
//! adapter yields the data payload of each frame as a plain string and leaves
//! JSON parsing to the stream translator.

use crate::Error;
use futures_util::{Stream, StreamExt};
use memchr::memmem;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Upper bound on buffered bytes awaiting a frame separator. A well-behaved
/// backend emits frames far smaller than this; exceeding it means the stream
/// is not SSE at all.
const MAX_BUFFER: usize = 1_000_000;

/// A stream adapter that parses SSE data frames from a byte stream.
/// Maintains internal state to handle frames split across chunks.
pub struct SseStream<S> {
    inner: S,
    /// Incomplete raw bytes from previous chunks.
    buffer: Vec<u8>,
    /// Parsed frames ready to be yielded.
    frames: VecDeque<String>,
}

impl<S> SseStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            frames: VecDeque::new(),
        }
    }

    /// Parse complete frames out of the buffer, leaving any trailing partial
    /// frame in place.
    fn parse_buffer(&mut self) -> Result<(), Error> {
        let separator = b"\n\n";
        let finder = memmem::Finder::new(separator);
        let mut start = 0;

        while let Some(pos) = finder.find(&self.buffer[start..]) {
            let frame_end = start + pos;
            let frame_bytes = &self.buffer[start..frame_end];

            let frame_text = std::str::from_utf8(frame_bytes)
                .map_err(|e| Error::streaming(format!("invalid UTF-8 in SSE frame: {e}")))?;

            if let Some(data) = Self::parse_single_frame(frame_text) {
                self.frames.push_back(data);
            }

            start = frame_end + separator.len();
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(())
    }

    /// Join the `data:` lines of one frame; comments and unknown fields are
    /// skipped. Frames without data yield nothing.
    fn parse_single_frame(frame_text: &str) -> Option<String> {
        let mut data_lines = Vec::new();

        for line in frame_text.lines() {
            let line = line.trim_end();

            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some((field, mut value)) = line.split_once(':') {
                if value.starts_with(' ') {
                    value = &value[1..];
                }
                if field == "data" {
                    data_lines.push(value.to_string());
                }
            }
        }

        if data_lines.is_empty() {
            None
        } else {
            Some(data_lines.join("\n"))
        }
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(frame) = self.frames.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }

            let chunk = match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    return Poll::Ready(Some(Err(Error::streaming(format!(
                        "upstream stream error: {e}"
                    )))));
                }
                None => {
                    // Stream ended; flush a trailing frame that arrived
                    // without its final separator.
                    if !self.buffer.is_empty() {
                        if let Ok(text) = std::str::from_utf8(&self.buffer) {
                            if let Some(data) = Self::parse_single_frame(text.trim()) {
                                self.buffer.clear();
                                return Poll::Ready(Some(Ok(data)));
                            }
                        }
                        self.buffer.clear();
                    }
                    return Poll::Ready(None);
                }
            };

            self.buffer.extend_from_slice(&chunk);

            if self.buffer.len() > MAX_BUFFER {
                self.buffer.clear();
                return Poll::Ready(Some(Err(Error::streaming(
                    "SSE buffer exceeded maximum size",
                ))));
            }

            if let Err(e) = self.parse_buffer() {
                return Poll::Ready(Some(Err(e)));
            }
        }
    }
}
