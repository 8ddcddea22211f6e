use crate::types::ProviderId;
use serde::{Deserialize, Serialize};

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn of conversation history, supplied by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A decoded, validated image attachment.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// MIME subtype as it appeared in the data URI, e.g. "image/png".
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// A generation request exactly as deserialized from the client body.
/// Everything beyond the three required fields is optional; the normalizer
/// fills in defaults and clamps ranges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGenerationRequest {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub include_history: bool,
    #[serde(default)]
    pub history_messages: Vec<Message>,
}

/// The canonical, validated request every component downstream of the
/// normalizer consumes. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub provider: ProviderId,
    pub model: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub images: Vec<ImageData>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub stream: bool,
    pub include_history: bool,
    pub history_messages: Vec<Message>,
}

impl GenerationRequest {
    pub fn is_vision(&self) -> bool {
        !self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_lowercase() {
        let msg: Message = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::User);

        let encoded = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert!(encoded.contains(r#""role":"assistant""#));
    }

    #[test]
    fn test_raw_request_defaults() {
        let raw: RawGenerationRequest =
            serde_json::from_str(r#"{"provider":"ollama","model":"m","prompt":"p"}"#).unwrap();
        assert!(!raw.stream);
        assert!(raw.images.is_empty());
        assert!(raw.history_messages.is_empty());
        assert!(raw.temperature.is_none());
    }
}
