//! A unified gateway over two local LLM backends.
//!
//! This library normalizes generation requests, adapts them to the wire
//! formats of an Ollama-style and an OpenAI-compatible (LM Studio) backend,
//! and exposes the results as buffered responses or Server-Sent Event
//! streams behind one request/event contract.

pub mod encoder;
pub mod error;
pub mod ndjson_stream;
pub mod normalize;
pub mod probe;
pub mod provider;
pub mod providers;
pub mod server;
pub mod sse_stream;
pub mod translator;
pub mod types;

// Re-export core types for easy usage
pub use error::Error;
pub use normalize::normalize;
pub use provider::{ChunkParser, ModelList, ParsedChunk, ProviderAdapter, RawChunkStream};
pub use providers::*;
pub use server::{router, AppState};
pub use translator::{translate, EventStream};
pub use types::*;
