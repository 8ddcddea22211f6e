//! Stream adapter for newline-delimited JSON, the framing the Ollama backend
//! uses for its streaming responses.
//!
//! Structurally the sibling of [`crate::sse_stream::SseStream`]: raw byte
//! chunks in, one complete line out per frame, with partial lines carried
//! across chunk boundaries.

use crate::Error;
use futures_util::{Stream, StreamExt};
use memchr::memchr;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

const MAX_BUFFER: usize = 1_000_000;

/// A stream adapter that yields one JSON line per frame from a byte stream.
pub struct NdjsonStream<S> {
    inner: S,
    /// Incomplete raw bytes from previous chunks.
    buffer: Vec<u8>,
    /// Complete lines ready to be yielded.
    lines: VecDeque<String>,
}

impl<S> NdjsonStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            lines: VecDeque::new(),
        }
    }

    /// Split complete lines out of the buffer, leaving a trailing partial
    /// line in place. Blank lines are dropped.
    fn parse_buffer(&mut self) -> Result<(), Error> {
        let mut start = 0;

        while let Some(pos) = memchr(b'\n', &self.buffer[start..]) {
            let line_end = start + pos;
            let line_bytes = &self.buffer[start..line_end];

            let line = std::str::from_utf8(line_bytes)
                .map_err(|e| Error::streaming(format!("invalid UTF-8 in NDJSON line: {e}")))?
                .trim_end_matches('\r');

            if !line.trim().is_empty() {
                self.lines.push_back(line.to_string());
            }

            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(())
    }
}

impl<S, E> Stream for NdjsonStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line) = self.lines.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }

            let chunk = match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    return Poll::Ready(Some(Err(Error::streaming(format!(
                        "upstream stream error: {e}"
                    )))));
                }
                None => {
                    // Flush a final line that arrived without its newline.
                    if !self.buffer.is_empty() {
                        let result = match std::str::from_utf8(&self.buffer) {
                            Ok(text) if !text.trim().is_empty() => {
                                Some(Ok(text.trim().to_string()))
                            }
                            Ok(_) => None,
                            Err(e) => Some(Err(Error::streaming(format!(
                                "invalid UTF-8 in NDJSON line: {e}"
                            )))),
                        };
                        self.buffer.clear();
                        if let Some(item) = result {
                            return Poll::Ready(Some(item));
                        }
                    }
                    return Poll::Ready(None);
                }
            };

            self.buffer.extend_from_slice(&chunk);

            if self.buffer.len() > MAX_BUFFER {
                self.buffer.clear();
                return Poll::Ready(Some(Err(Error::streaming(
                    "NDJSON buffer exceeded maximum size",
                ))));
            }

            if let Err(e) = self.parse_buffer() {
                return Poll::Ready(Some(Err(e)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: &[&[u8]]) -> Vec<Result<bytes::Bytes, std::io::Error>> {
        parts
            .iter()
            .map(|p| Ok(bytes::Bytes::copy_from_slice(p)))
            .collect()
    }

    #[tokio::test]
    async fn test_complete_lines() {
        let byte_stream = stream::iter(chunks(&[b"{\"a\":1}\n{\"b\":2}\n"]));
        let mut lines = NdjsonStream::new(byte_stream);

        assert_eq!(lines.next().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(lines.next().await.unwrap().unwrap(), "{\"b\":2}");
        assert!(lines.next().await.is_none());
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let byte_stream = stream::iter(chunks(&[b"{\"respon", b"se\":\"hi\"}\n{\"do", b"ne\":true}\n"]));
        let mut lines = NdjsonStream::new(byte_stream);

        assert_eq!(lines.next().await.unwrap().unwrap(), "{\"response\":\"hi\"}");
        assert_eq!(lines.next().await.unwrap().unwrap(), "{\"done\":true}");
        assert!(lines.next().await.is_none());
    }

    #[tokio::test]
    async fn test_blank_lines_and_crlf() {
        let byte_stream = stream::iter(chunks(&[b"{\"a\":1}\r\n\n{\"b\":2}\r\n"]));
        let mut lines = NdjsonStream::new(byte_stream);

        assert_eq!(lines.next().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(lines.next().await.unwrap().unwrap(), "{\"b\":2}");
        assert!(lines.next().await.is_none());
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let byte_stream = stream::iter(chunks(&[b"{\"a\":1}\n{\"done\":true}"]));
        let mut lines = NdjsonStream::new(byte_stream);

        assert_eq!(lines.next().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(lines.next().await.unwrap().unwrap(), "{\"done\":true}");
        assert!(lines.next().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_error() {
        let byte_stream = stream::iter(chunks(&[b"{\"a\":\"\xFF\"}\n"]));
        let mut lines = NdjsonStream::new(byte_stream);

        assert!(lines.next().await.unwrap().is_err());
    }
}
