//! Provider adapters. All provider-specific wire knowledge lives here.

pub mod lmstudio;
pub mod ollama;

pub use lmstudio::LmStudioAdapter;
pub use ollama::OllamaAdapter;

use crate::provider::ProviderAdapter;
use crate::types::{ProviderConfig, ProviderId};

/// Select the adapter for a provider, once per request.
pub fn adapter_for(config: ProviderConfig, client: reqwest::Client) -> Box<dyn ProviderAdapter> {
    match config.id {
        ProviderId::Ollama => Box::new(OllamaAdapter::new(config, client)),
        ProviderId::LmStudio => Box::new(LmStudioAdapter::new(config, client)),
    }
}
