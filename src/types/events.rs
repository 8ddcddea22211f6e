//! Canonical events emitted by the stream translator.

use serde_json::{json, Value};

/// One event in a canonical generation stream.
///
/// Every stream carries zero or more `Token` events followed by exactly one
/// terminal event (`Done` or `Error`, never both). The translator enforces
/// this; the encoder and the buffered path rely on it.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// One generated fragment.
    Token { token: String },
    /// Successful end of stream. `full_response` is the concatenation of all
    /// prior tokens in emission order.
    Done { full_response: String },
    /// Failed end of stream.
    Error { error: String },
}

impl GenerationEvent {
    /// Whether this event terminates its stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationEvent::Token { .. })
    }

    /// The client-facing JSON payload for this event.
    pub fn to_json(&self) -> Value {
        match self {
            GenerationEvent::Token { token } => json!({ "token": token }),
            GenerationEvent::Done { full_response } => {
                json!({ "done": true, "full_response": full_response })
            }
            GenerationEvent::Error { error } => json!({ "error": error, "done": true }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(!GenerationEvent::Token {
            token: "a".to_string()
        }
        .is_terminal());
        assert!(GenerationEvent::Done {
            full_response: "a".to_string()
        }
        .is_terminal());
        assert!(GenerationEvent::Error {
            error: "x".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_wire_payloads() {
        let token = GenerationEvent::Token {
            token: "hi".to_string(),
        };
        assert_eq!(token.to_json(), serde_json::json!({"token": "hi"}));

        let done = GenerationEvent::Done {
            full_response: "hi there".to_string(),
        };
        assert_eq!(
            done.to_json(),
            serde_json::json!({"done": true, "full_response": "hi there"})
        );

        let error = GenerationEvent::Error {
            error: "upstream dropped".to_string(),
        };
        assert_eq!(
            error.to_json(),
            serde_json::json!({"error": "upstream dropped", "done": true})
        );
    }
}
