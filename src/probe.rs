//! Availability probing: liveness and model-list queries against the
//! configured providers.
//!
//! Probes are bounded by a short timeout so the status endpoints never become
//! a slow path; results are not cached, trading a little latency for never
//! reporting stale availability.

use crate::provider::ModelList;
use crate::providers::adapter_for;
use crate::types::ProviderConfig;
use crate::Error;
use serde::Serialize;
use std::time::Duration;

/// Liveness probes get a few seconds, unlike generation calls which may run
/// for minutes while a model loads.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub available: bool,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Probe one provider. Disabled providers short-circuit with no network call.
pub async fn status(config: &ProviderConfig, client: &reqwest::Client) -> ProviderStatus {
    if !config.enabled {
        return ProviderStatus {
            available: false,
            enabled: false,
            url: None,
        };
    }

    let adapter = adapter_for(config.clone(), client.clone());
    let available = match tokio::time::timeout(PROBE_TIMEOUT, adapter.list_models()).await {
        Ok(Ok(_)) => true,
        Ok(Err(error)) => {
            tracing::debug!(provider = %config.id, %error, "liveness probe failed");
            false
        }
        Err(_) => {
            tracing::debug!(provider = %config.id, "liveness probe timed out");
            false
        }
    };

    ProviderStatus {
        available,
        enabled: true,
        url: Some(config.base_url.clone()),
    }
}

/// List a provider's models, optionally restricted to vision-capable ones.
/// Disabled providers yield an empty list without a network call.
pub async fn models(
    config: &ProviderConfig,
    client: &reqwest::Client,
    vision_only: bool,
) -> Result<ModelList, Error> {
    if !config.enabled {
        return Ok(ModelList {
            models: Vec::new(),
            heuristic: false,
        });
    }

    let adapter = adapter_for(config.clone(), client.clone());
    let listing = async {
        if vision_only {
            adapter.list_vision_models().await
        } else {
            Ok(ModelList {
                models: adapter.list_models().await?,
                heuristic: false,
            })
        }
    };

    match tokio::time::timeout(PROBE_TIMEOUT, listing).await {
        Ok(result) => result,
        Err(_) => Err(Error::unreachable(
            config.id.as_str(),
            "model list timed out",
        )),
    }
}
