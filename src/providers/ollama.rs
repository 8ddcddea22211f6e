//! Adapter for the Ollama backend.
//!
//! Wire shape: `POST /api/generate` with a flat `prompt` plus a raw-base64
//! `images` array; streaming responses are newline-delimited JSON objects
//! carrying a `response` delta and a `done` flag. Models come from
//! `/api/tags`, which reports family tags we use as the vision capability
//! signal.

use crate::ndjson_stream::NdjsonStream;
use crate::provider::{ChunkParser, ModelList, ParsedChunk, ProviderAdapter, RawChunkStream};
use crate::types::{GenerationRequest, Message, ProviderConfig, Role};
use crate::Error;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Family tags Ollama reports for multimodal models.
const VISION_FAMILIES: &[&str] = &["clip", "mllama", "qwen2vl"];

pub struct OllamaAdapter {
    config: ProviderConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    top_p: f64,
    num_predict: u32,
    presence_penalty: f64,
    frequency_penalty: f64,
}

#[derive(Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
    #[serde(default)]
    details: OllamaModelDetails,
}

#[derive(Deserialize, Default)]
struct OllamaModelDetails {
    #[serde(default)]
    families: Option<Vec<String>>,
}

impl OllamaAdapter {
    pub fn new(config: ProviderConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn convert_request(&self, request: &GenerationRequest, stream: bool) -> OllamaGenerateRequest {
        // /api/generate has no message array, so conversation history is
        // rendered into the prompt as a transcript.
        let prompt = if request.include_history && !request.history_messages.is_empty() {
            render_transcript(&request.history_messages, &request.prompt)
        } else {
            request.prompt.clone()
        };

        OllamaGenerateRequest {
            model: request.model.clone(),
            prompt,
            system: request.system_prompt.clone(),
            images: request
                .images
                .iter()
                .map(|image| BASE64.encode(&image.bytes))
                .collect(),
            stream,
            options: OllamaOptions {
                temperature: request.temperature,
                top_p: request.top_p,
                num_predict: request.max_tokens,
                presence_penalty: request.presence_penalty,
                frequency_penalty: request.frequency_penalty,
            },
        }
    }

    async fn post_generate(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, Error> {
        let provider = self.config.id.as_str();
        let response = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&self.convert_request(request, stream))
            .send()
            .await
            .map_err(|e| Error::from_transport(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND && body.contains("not found") {
                return Err(Error::ModelNotFound(request.model.clone()));
            }
            return Err(Error::upstream(provider, format!("{status}: {body}")));
        }

        Ok(response)
    }

    async fn fetch_tags(&self) -> Result<Vec<OllamaModel>, Error> {
        let provider = self.config.id.as_str();
        let response = self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .send()
            .await
            .map_err(|e| Error::from_transport(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(provider, format!("{status}: {body}")));
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(provider, e.to_string()))?;
        Ok(tags.models)
    }
}

/// Parse one NDJSON line from an Ollama stream.
pub fn parse_chunk(frame: &str) -> Result<ParsedChunk, Error> {
    let chunk: OllamaChunk = serde_json::from_str(frame)
        .map_err(|e| Error::streaming(format!("malformed ollama chunk: {e}")))?;

    if let Some(error) = chunk.error {
        return Err(Error::upstream("ollama", error));
    }

    let delta = chunk.response.filter(|r| !r.is_empty());
    if chunk.done {
        Ok(ParsedChunk::done(delta))
    } else {
        Ok(ParsedChunk {
            delta,
            done: false,
        })
    }
}

fn render_transcript(history: &[Message], prompt: &str) -> String {
    let mut transcript = String::new();
    for message in history {
        let speaker = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        transcript.push_str(speaker);
        transcript.push_str(": ");
        transcript.push_str(&message.content);
        transcript.push('\n');
    }
    transcript.push_str("User: ");
    transcript.push_str(prompt);
    transcript
}

fn is_vision_model(model: &OllamaModel) -> bool {
    model
        .details
        .families
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|family| VISION_FAMILIES.contains(&family.to_lowercase().as_str()))
}

#[async_trait::async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, Error> {
        let response = self.post_generate(request, false).await?;
        let chunk: OllamaChunk = response
            .json()
            .await
            .map_err(|e| Error::upstream(self.config.id.as_str(), e.to_string()))?;

        if let Some(error) = chunk.error {
            return Err(Error::upstream(self.config.id.as_str(), error));
        }
        Ok(chunk.response.unwrap_or_default())
    }

    async fn generate_stream(&self, request: &GenerationRequest) -> Result<RawChunkStream, Error> {
        let response = self.post_generate(request, true).await?;
        Ok(Box::pin(NdjsonStream::new(response.bytes_stream())))
    }

    async fn list_models(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .fetch_tags()
            .await?
            .into_iter()
            .map(|model| model.name)
            .collect())
    }

    async fn list_vision_models(&self) -> Result<ModelList, Error> {
        let models = self
            .fetch_tags()
            .await?
            .into_iter()
            .filter(is_vision_model)
            .map(|model| model.name)
            .collect();

        Ok(ModelList {
            models,
            heuristic: false,
        })
    }

    fn chunk_parser(&self) -> ChunkParser {
        parse_chunk
    }
}
