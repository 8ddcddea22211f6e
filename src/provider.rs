use crate::types::{GenerationRequest, ProviderConfig};
use crate::Error;
use futures_util::Stream;
use std::pin::Pin;

/// A lazy, cancellable sequence of raw provider frames. Each item is one
/// frame in the provider's own streaming format (an NDJSON line or an SSE
/// data payload); dropping the stream cancels the upstream request.
pub type RawChunkStream = Pin<Box<dyn Stream<Item = Result<String, Error>> + Send>>;

/// What the translator extracts from one raw frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedChunk {
    /// Textual delta carried by the frame, if any. Heartbeats and
    /// metadata-only frames carry none.
    pub delta: Option<String>,
    /// Whether this frame is the provider's terminal marker.
    pub done: bool,
}

impl ParsedChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: Some(text.into()),
            done: false,
        }
    }

    pub fn empty() -> Self {
        Self {
            delta: None,
            done: false,
        }
    }

    pub fn done(delta: Option<String>) -> Self {
        Self { delta, done: true }
    }
}

/// Parses one raw frame into a [`ParsedChunk`]. Each adapter supplies the
/// parser for its own wire format; nothing outside the adapter inspects
/// provider identity.
pub type ChunkParser = fn(&str) -> Result<ParsedChunk, Error>;

/// A model list together with how it was filtered.
#[derive(Debug, Clone, Default)]
pub struct ModelList {
    pub models: Vec<String>,
    /// True when vision capability was inferred from model names rather than
    /// reported by the backend.
    pub heuristic: bool,
}

/// One backend, translated to and from the canonical request/event contract.
///
/// Adapters are stateless per call: they hold only the resolved provider
/// configuration and an HTTP client handle.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn config(&self) -> &ProviderConfig;

    /// Issue a non-streaming generation and await the full response text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, Error>;

    /// Issue a streaming generation and expose the raw provider frames.
    async fn generate_stream(&self, request: &GenerationRequest) -> Result<RawChunkStream, Error>;

    /// All models the backend currently serves.
    async fn list_models(&self) -> Result<Vec<String>, Error>;

    /// Vision-capable models, with the heuristic flag set when the backend
    /// does not self-report capabilities.
    async fn list_vision_models(&self) -> Result<ModelList, Error>;

    /// The frame parser matching this adapter's streaming format.
    fn chunk_parser(&self) -> ChunkParser;
}
