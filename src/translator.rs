//! The stream translator: a state machine turning raw provider frames into
//! the canonical event sequence.
//!
//! Guarantees, relied upon by the encoder and the HTTP handlers:
//! - exactly one terminal event per stream (`Done` xor `Error`);
//! - no event after the terminal one;
//! - `Done.full_response` is the concatenation of every emitted token in
//!   emission order, never a provider-reported full text.

use crate::provider::{ChunkParser, RawChunkStream};
use crate::types::GenerationEvent;
use crate::Error;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Translate a raw frame stream into canonical generation events.
pub fn translate(raw: RawChunkStream, parser: ChunkParser) -> EventStream {
    EventStream {
        raw: Some(raw),
        parser,
        accumulated: String::new(),
    }
}

/// Canonical event stream over one upstream generation.
///
/// Once a terminal event has been emitted the inner stream is dropped, which
/// both discards any residual frames and cancels the upstream request.
pub struct EventStream {
    raw: Option<RawChunkStream>,
    parser: ChunkParser,
    accumulated: String,
}

impl EventStream {
    fn terminate(&mut self, event: GenerationEvent) -> Poll<Option<GenerationEvent>> {
        self.raw = None;
        Poll::Ready(Some(event))
    }
}

impl Stream for EventStream {
    type Item = GenerationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let raw = match self.raw.as_mut() {
                Some(raw) => raw,
                // Terminal event already emitted; the stream is fused.
                None => return Poll::Ready(None),
            };

            let frame = match raw.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(frame))) => frame,
                Poll::Ready(Some(Err(e))) => {
                    return self.terminate(GenerationEvent::Error {
                        error: e.to_string(),
                    });
                }
                Poll::Ready(None) => {
                    // Upstream closed without its terminal marker.
                    return self.terminate(GenerationEvent::Error {
                        error: "stream ended unexpectedly".to_string(),
                    });
                }
            };

            let chunk = match (self.parser)(&frame) {
                Ok(chunk) => chunk,
                Err(e) => {
                    return self.terminate(GenerationEvent::Error {
                        error: e.to_string(),
                    });
                }
            };

            if chunk.done {
                // A terminal frame may still carry a final delta.
                if let Some(delta) = chunk.delta {
                    self.accumulated.push_str(&delta);
                }
                let full_response = std::mem::take(&mut self.accumulated);
                return self.terminate(GenerationEvent::Done { full_response });
            }

            match chunk.delta {
                Some(delta) if !delta.is_empty() => {
                    self.accumulated.push_str(&delta);
                    return Poll::Ready(Some(GenerationEvent::Token { token: delta }));
                }
                // Heartbeat or metadata-only frame; keep pulling.
                _ => continue,
            }
        }
    }
}

/// Drain a canonical event stream into the final response text.
///
/// Used by tests and by callers that want the buffered view of a stream; the
/// buffered HTTP path normally goes through the adapter's native
/// non-streaming call instead.
pub async fn collect_response(
    mut events: impl Stream<Item = GenerationEvent> + Unpin,
) -> Result<String, Error> {
    while let Some(event) = events.next().await {
        match event {
            GenerationEvent::Token { .. } => {}
            GenerationEvent::Done { full_response } => return Ok(full_response),
            GenerationEvent::Error { error } => return Err(Error::streaming(error)),
        }
    }
    Err(Error::streaming("stream ended without a terminal event"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ParsedChunk;
    use futures_util::stream;

    fn raw_stream(frames: Vec<Result<String, Error>>) -> RawChunkStream {
        Box::pin(stream::iter(frames))
    }

    /// Test parser: "tok:<x>" is a delta, "done" the terminal marker,
    /// "meta" a delta-less frame, anything else malformed.
    fn test_parser(frame: &str) -> Result<ParsedChunk, Error> {
        if let Some(text) = frame.strip_prefix("tok:") {
            Ok(ParsedChunk::delta(text))
        } else if frame == "done" {
            Ok(ParsedChunk::done(None))
        } else if frame == "meta" {
            Ok(ParsedChunk::empty())
        } else {
            Err(Error::streaming(format!("malformed chunk: {frame}")))
        }
    }

    fn ok_frames(frames: &[&str]) -> RawChunkStream {
        raw_stream(frames.iter().map(|f| Ok(f.to_string())).collect())
    }

    #[tokio::test]
    async fn test_done_is_concatenation_of_tokens() {
        let events: Vec<_> = translate(ok_frames(&["tok:Hel", "meta", "tok:lo", "done"]), test_parser)
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                GenerationEvent::Token {
                    token: "Hel".to_string()
                },
                GenerationEvent::Token {
                    token: "lo".to_string()
                },
                GenerationEvent::Done {
                    full_response: "Hello".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_exactly_one_terminal_event() {
        // Frames after the terminal marker are discarded, not emitted.
        let events: Vec<_> = translate(
            ok_frames(&["tok:a", "done", "tok:never", "done"]),
            test_parser,
        )
        .collect()
        .await;

        assert_eq!(events.len(), 2);
        assert!(events[..1].iter().all(|e| !e.is_terminal()));
        assert_eq!(
            events[1],
            GenerationEvent::Done {
                full_response: "a".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_chunk_errors_once() {
        let events: Vec<_> = translate(
            ok_frames(&["tok:a", "garbage", "tok:b", "done"]),
            test_parser,
        )
        .collect()
        .await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            GenerationEvent::Token {
                token: "a".to_string()
            }
        );
        match &events[1] {
            GenerationEvent::Error { error } => assert!(error.contains("malformed chunk")),
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upstream_error_becomes_error_event() {
        let frames = vec![
            Ok("tok:a".to_string()),
            Err(Error::streaming("connection reset")),
            Ok("tok:b".to_string()),
        ];
        let events: Vec<_> = translate(raw_stream(frames), test_parser).collect().await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], GenerationEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_eof_without_terminal_marker() {
        let events: Vec<_> = translate(ok_frames(&["tok:a", "tok:b"]), test_parser)
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        match &events[2] {
            GenerationEvent::Error { error } => {
                assert!(error.contains("ended unexpectedly"));
            }
            other => panic!("expected error event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_terminal_frame_with_final_delta() {
        fn parser(frame: &str) -> Result<ParsedChunk, Error> {
            if frame == "end:!" {
                Ok(ParsedChunk::done(Some("!".to_string())))
            } else {
                test_parser(frame)
            }
        }

        let events: Vec<_> = translate(ok_frames(&["tok:hi", "end:!"]), parser)
            .collect()
            .await;

        // The final delta is folded into full_response without a token event.
        assert_eq!(
            events,
            vec![
                GenerationEvent::Token {
                    token: "hi".to_string()
                },
                GenerationEvent::Done {
                    full_response: "hi!".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_stream_is_an_error() {
        let events: Vec<_> = translate(ok_frames(&[]), test_parser).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GenerationEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_collect_response() {
        let text = collect_response(translate(
            ok_frames(&["tok:Hello", "tok: world", "done"]),
            test_parser,
        ))
        .await
        .unwrap();
        assert_eq!(text, "Hello world");

        let err = collect_response(translate(ok_frames(&["oops"]), test_parser))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Streaming(_)));
    }

    #[tokio::test]
    async fn test_random_chunk_sequences_have_single_terminal() {
        // Cheap generative check over arbitrary frame mixes: whatever the
        // input, the output has exactly one terminal event and it is last.
        let vocab = ["tok:x", "meta", "done", "garbage", "tok:"];
        let mut seed: u32 = 0x2545_F491;

        for _ in 0..200 {
            let mut frames = Vec::new();
            for _ in 0..(seed % 12) {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                frames.push(vocab[(seed % vocab.len() as u32) as usize]);
            }
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);

            let events: Vec<_> = translate(ok_frames(&frames), test_parser).collect().await;

            let terminals = events.iter().filter(|e| e.is_terminal()).count();
            assert_eq!(terminals, 1, "frames: {frames:?}, events: {events:?}");
            assert!(events.last().unwrap().is_terminal());
        }
    }
}
