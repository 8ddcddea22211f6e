//! Adapter for the LM Studio backend (OpenAI-compatible chat completions).
//!
//! Wire shape: `POST /v1/chat/completions` with a `messages` array; vision
//! requests inline each image as a data-URI `image_url` part. Streaming
//! responses are SSE `data:` frames carrying `choices[0].delta.content`,
//! terminated by a `[DONE]` sentinel. Models come from `/v1/models`, which
//! reports no capability metadata, so the vision list is filtered by name
//! patterns and flagged as heuristic.

use crate::provider::{ChunkParser, ModelList, ParsedChunk, ProviderAdapter, RawChunkStream};
use crate::sse_stream::SseStream;
use crate::types::{GenerationRequest, ProviderConfig, Role};
use crate::Error;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Name fragments that usually indicate a vision-capable model. A heuristic,
/// not a guarantee; responses built from it carry `heuristic: true`.
const VISION_NAME_PATTERNS: &[&str] = &[
    "llava",
    "vision",
    "-vl",
    "vl-",
    "moondream",
    "bakllava",
    "minicpm-v",
    "pixtral",
];

pub struct LmStudioAdapter {
    config: ProviderConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    presence_penalty: f64,
    frequency_penalty: f64,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: ChatContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
    #[serde(default)]
    delta: Option<ChatDelta>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl LmStudioAdapter {
    pub fn new(config: ProviderConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn convert_request(&self, request: &GenerationRequest, stream: bool) -> ChatCompletionsRequest {
        let mut messages = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: ChatContent::Text(system.clone()),
            });
        }

        if request.include_history {
            for message in &request.history_messages {
                messages.push(ChatMessage {
                    role: match message.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: ChatContent::Text(message.content.clone()),
                });
            }
        }

        let content = if request.images.is_empty() {
            ChatContent::Text(request.prompt.clone())
        } else {
            let mut parts = vec![ContentPart::Text {
                text: request.prompt.clone(),
            }];
            parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{};base64,{}", image.mime, BASE64.encode(&image.bytes)),
                },
            }));
            ChatContent::Parts(parts)
        };
        messages.push(ChatMessage {
            role: "user",
            content,
        });

        ChatCompletionsRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            presence_penalty: request.presence_penalty,
            frequency_penalty: request.frequency_penalty,
            stream,
        }
    }

    async fn post_chat(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, Error> {
        let provider = self.config.id.as_str();
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .json(&self.convert_request(request, stream))
            .send()
            .await
            .map_err(|e| Error::from_transport(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(Error::ModelNotFound(request.model.clone()));
            }
            return Err(Error::upstream(provider, format!("{status}: {body}")));
        }

        Ok(response)
    }
}

/// Parse one SSE data payload from an OpenAI-style stream.
pub fn parse_chunk(frame: &str) -> Result<ParsedChunk, Error> {
    if frame.trim() == "[DONE]" {
        return Ok(ParsedChunk::done(None));
    }

    let chunk: ChatCompletionsResponse = serde_json::from_str(frame)
        .map_err(|e| Error::streaming(format!("malformed chat completion chunk: {e}")))?;

    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty());

    Ok(ParsedChunk { delta, done: false })
}

fn looks_like_vision_model(id: &str) -> bool {
    let id = id.to_lowercase();
    VISION_NAME_PATTERNS
        .iter()
        .any(|pattern| id.contains(pattern))
}

#[async_trait::async_trait]
impl ProviderAdapter for LmStudioAdapter {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, Error> {
        let provider = self.config.id.as_str();
        let response = self.post_chat(request, false).await?;
        let completion: ChatCompletionsResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(provider, e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| Error::upstream(provider, "response carried no content"))
    }

    async fn generate_stream(&self, request: &GenerationRequest) -> Result<RawChunkStream, Error> {
        let response = self.post_chat(request, true).await?;
        Ok(Box::pin(SseStream::new(response.bytes_stream())))
    }

    async fn list_models(&self) -> Result<Vec<String>, Error> {
        let provider = self.config.id.as_str();
        let response = self
            .client
            .get(format!("{}/v1/models", self.config.base_url))
            .send()
            .await
            .map_err(|e| Error::from_transport(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(provider, format!("{status}: {body}")));
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(provider, e.to_string()))?;
        Ok(models.data.into_iter().map(|entry| entry.id).collect())
    }

    async fn list_vision_models(&self) -> Result<ModelList, Error> {
        let models = self
            .list_models()
            .await?
            .into_iter()
            .filter(|id| looks_like_vision_model(id))
            .collect();

        Ok(ModelList {
            models,
            heuristic: true,
        })
    }

    fn chunk_parser(&self) -> ChunkParser {
        parse_chunk
    }
}
