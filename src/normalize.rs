//! Request normalization: validation and clamping of incoming generation
//! requests before any network call is made.

use crate::types::{GatewayConfig, GenerationRequest, ImageData, ProviderId, RawGenerationRequest};
use crate::Error;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

const MAX_IMAGES: usize = 10;
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TOP_P: f64 = 0.9;
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Validate and clamp a raw client request into a canonical one.
///
/// Pure over its input; the config is only consulted for the enabled flag and
/// vision capability of the requested provider. Out-of-range sampling
/// parameters are clamped rather than rejected, on every endpoint alike.
pub fn normalize(
    raw: RawGenerationRequest,
    config: &GatewayConfig,
) -> Result<GenerationRequest, Error> {
    let provider_name = require(raw.provider, "provider")?;
    let model = require(raw.model, "model")?;
    let prompt = require(raw.prompt, "prompt")?;

    let provider = ProviderId::parse(&provider_name)
        .ok_or_else(|| Error::validation(format!("unknown provider {provider_name}")))?;

    let provider_config = config.provider(provider);
    if !provider_config.enabled {
        return Err(Error::unreachable(provider.as_str(), "provider is disabled"));
    }

    if !raw.images.is_empty() && !provider_config.capabilities.vision {
        return Err(Error::validation(format!(
            "provider {provider} does not support vision requests"
        )));
    }

    let images = decode_images(&raw.images)?;

    Ok(GenerationRequest {
        provider,
        model,
        prompt,
        system_prompt: raw.system_prompt.filter(|s| !s.is_empty()),
        images,
        temperature: clamp(raw.temperature, 0.0, 2.0, DEFAULT_TEMPERATURE),
        top_p: clamp(raw.top_p, 0.0, 1.0, DEFAULT_TOP_P),
        max_tokens: raw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).max(1),
        presence_penalty: clamp(raw.presence_penalty, -2.0, 2.0, 0.0),
        frequency_penalty: clamp(raw.frequency_penalty, -2.0, 2.0, 0.0),
        stream: raw.stream,
        include_history: raw.include_history,
        history_messages: raw.history_messages,
    })
}

fn require(field: Option<String>, name: &str) -> Result<String, Error> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::validation(format!("missing field {name}"))),
    }
}

fn clamp(value: Option<f64>, min: f64, max: f64, default: f64) -> f64 {
    value.unwrap_or(default).clamp(min, max)
}

/// Decode and validate the image set. First violation short-circuits.
fn decode_images(images: &[String]) -> Result<Vec<ImageData>, Error> {
    if images.len() > MAX_IMAGES {
        return Err(Error::validation(format!(
            "too many images: {} (max {MAX_IMAGES})",
            images.len()
        )));
    }

    images
        .iter()
        .enumerate()
        .map(|(index, uri)| decode_image(index, uri))
        .collect()
}

fn decode_image(index: usize, uri: &str) -> Result<ImageData, Error> {
    // Expected shape: data:image/png;base64,<payload>
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::validation("Invalid image format"))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| Error::validation("Invalid image format"))?;

    if !ALLOWED_IMAGE_TYPES.contains(&mime) {
        return Err(Error::validation(format!(
            "image {index}: unsupported type {mime}"
        )));
    }

    let bytes = BASE64
        .decode(payload)
        .map_err(|_| Error::validation("Invalid image format"))?;

    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(Error::validation(format!(
            "image {index}: {} bytes exceeds the 10MB limit",
            bytes.len()
        )));
    }

    Ok(ImageData {
        mime: mime.to_string(),
        bytes,
    })
}
