//! SSE encoding of canonical events onto the client connection.
//!
//! The encoder is independent of which provider produced the events: one
//! `data: {json}\n\n` frame per event, connection closed after the terminal
//! frame. Because the body is a pull-based stream, a client disconnect drops
//! it, which drops the translator and with it the upstream request. That is
//! the cancellation path, no bookkeeping required.

use crate::types::GenerationEvent;
use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;

/// The wire frame for one event: `data: {json}\n\n`.
pub fn event_frame(event: &GenerationEvent) -> String {
    format!("data: {}\n\n", event.to_json())
}

/// Build the `text/event-stream` response for a canonical event stream.
///
/// Always HTTP 200: SSE cannot change status once headers are out, so
/// failures arrive as a terminal error frame instead.
pub fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = GenerationEvent> + Send + 'static,
{
    let body = Body::from_stream(
        events.map(|event| Ok::<_, Infallible>(Bytes::from(event_frame(&event)))),
    );

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_frame() {
        let frame = event_frame(&GenerationEvent::Token {
            token: "hi".to_string(),
        });
        assert_eq!(frame, "data: {\"token\":\"hi\"}\n\n");
    }

    #[test]
    fn test_done_frame() {
        let frame = event_frame(&GenerationEvent::Done {
            full_response: "hi there".to_string(),
        });
        assert_eq!(frame, "data: {\"done\":true,\"full_response\":\"hi there\"}\n\n");
    }

    #[test]
    fn test_error_frame() {
        let frame = event_frame(&GenerationEvent::Error {
            error: "boom".to_string(),
        });
        assert_eq!(frame, "data: {\"done\":true,\"error\":\"boom\"}\n\n");
    }

    #[test]
    fn test_frames_escape_json_strings() {
        let frame = event_frame(&GenerationEvent::Token {
            token: "line\nbreak \"quoted\"".to_string(),
        });
        // The newline must be escaped or it would split the SSE frame.
        assert!(frame.contains(r#"line\nbreak \"quoted\""#));
        assert_eq!(frame.matches('\n').count(), 2);
    }

    #[tokio::test]
    async fn test_sse_response_headers() {
        let response = sse_response(futures_util::stream::iter(vec![GenerationEvent::Done {
            full_response: String::new(),
        }]));
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
    }
}
