use serde::{Deserialize, Serialize};
use std::env;

/// The two supported local backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Ollama,
    LmStudio,
}

impl ProviderId {
    /// Stable lowercase name, used in routes, logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Ollama => "ollama",
            ProviderId::LmStudio => "lmstudio",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "ollama" => Some(ProviderId::Ollama),
            "lmstudio" | "lm_studio" | "lm-studio" => Some(ProviderId::LmStudio),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a provider can do, as configured (not probed).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Capabilities {
    pub text: bool,
    pub vision: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            text: true,
            vision: true,
        }
    }
}

/// Per-provider configuration. Immutable at request time; handlers receive it
/// by reference and adapters hold a clone for the duration of one call.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: ProviderId,
    pub base_url: String,
    pub enabled: bool,
    pub capabilities: Capabilities,
}

impl ProviderConfig {
    pub fn new(id: ProviderId, base_url: impl Into<String>) -> Self {
        Self {
            id,
            base_url: base_url.into(),
            enabled: true,
            capabilities: Capabilities::default(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Configuration for both providers, loaded once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub ollama: ProviderConfig,
    pub lmstudio: ProviderConfig,
}

impl GatewayConfig {
    /// Look up the configuration for one provider.
    pub fn provider(&self, id: ProviderId) -> &ProviderConfig {
        match id {
            ProviderId::Ollama => &self.ollama,
            ProviderId::LmStudio => &self.lmstudio,
        }
    }

    /// Build configuration from environment variables, falling back to the
    /// default ports of the two local services.
    pub fn from_env() -> Self {
        let ollama_url =
            env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
        let lmstudio_url =
            env::var("LMSTUDIO_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:1234".to_string());

        let mut ollama = ProviderConfig::new(ProviderId::Ollama, ollama_url);
        ollama.enabled = env_flag("OLLAMA_ENABLED", true);

        let mut lmstudio = ProviderConfig::new(ProviderId::LmStudio, lmstudio_url);
        lmstudio.enabled = env_flag("LMSTUDIO_ENABLED", true);

        Self { ollama, lmstudio }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parse() {
        assert_eq!(ProviderId::parse("ollama"), Some(ProviderId::Ollama));
        assert_eq!(ProviderId::parse("LMStudio"), Some(ProviderId::LmStudio));
        assert_eq!(ProviderId::parse("lm-studio"), Some(ProviderId::LmStudio));
        assert_eq!(ProviderId::parse("openai"), None);
    }

    #[test]
    fn test_provider_lookup() {
        let config = GatewayConfig {
            ollama: ProviderConfig::new(ProviderId::Ollama, "http://localhost:11434"),
            lmstudio: ProviderConfig::new(ProviderId::LmStudio, "http://localhost:1234").disabled(),
        };

        assert!(config.provider(ProviderId::Ollama).enabled);
        assert!(!config.provider(ProviderId::LmStudio).enabled);
        assert_eq!(
            config.provider(ProviderId::LmStudio).base_url,
            "http://localhost:1234"
        );
    }
}
