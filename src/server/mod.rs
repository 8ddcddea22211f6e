//! The HTTP surface: routing and handler logic for the gateway endpoints.

use crate::encoder;
use crate::normalize::normalize;
use crate::probe;
use crate::providers::adapter_for;
use crate::translator::{translate, EventStream};
use crate::types::{GatewayConfig, GenerationEvent, RawGenerationRequest};
use crate::Error;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

/// Shared, read-only state: the provider configuration and one HTTP client.
/// The client carries no overall timeout since generation calls may run for
/// minutes; probes bound their own waits.
#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

/// Build the gateway router. The vision endpoints share handlers with the
/// text ones; whether a request is vision is a property of its image set,
/// validated by the normalizer either way.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/models", get(models))
        .route("/vision_models", get(vision_models))
        .route("/generate", post(generate))
        .route("/generate_stream", post(generate_stream))
        .route("/vision_generate", post(generate))
        .route("/vision_generate_stream", post(generate_stream))
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> Response {
    let (ollama, lmstudio) = tokio::join!(
        probe::status(&state.config.ollama, &state.http),
        probe::status(&state.config.lmstudio, &state.http),
    );

    Json(json!({
        "success": true,
        "ollama": ollama,
        "lmstudio": lmstudio,
    }))
    .into_response()
}

async fn models(State(state): State<AppState>) -> Response {
    model_listing(state, false).await
}

async fn vision_models(State(state): State<AppState>) -> Response {
    model_listing(state, true).await
}

async fn model_listing(state: AppState, vision_only: bool) -> Response {
    let (ollama, lmstudio) = tokio::join!(
        probe::models(&state.config.ollama, &state.http, vision_only),
        probe::models(&state.config.lmstudio, &state.http, vision_only),
    );

    let ollama = ollama.unwrap_or_else(|error| {
        tracing::warn!(provider = "ollama", %error, "model list failed");
        Default::default()
    });
    let lmstudio = lmstudio.unwrap_or_else(|error| {
        tracing::warn!(provider = "lmstudio", %error, "model list failed");
        Default::default()
    });

    let mut body = json!({
        "success": true,
        "models": {
            "ollama": ollama.models,
            "lmstudio": lmstudio.models,
        },
    });
    if vision_only {
        // Callers can tell a reported capability from a name-pattern guess.
        body["heuristic"] = json!({
            "ollama": ollama.heuristic,
            "lmstudio": lmstudio.heuristic,
        });
    }

    Json(body).into_response()
}

async fn generate(State(state): State<AppState>, Json(raw): Json<RawGenerationRequest>) -> Response {
    match buffered_generation(&state, raw).await {
        Ok(text) => Json(json!({ "success": true, "response": text })).into_response(),
        Err(error) => error_response(&error),
    }
}

async fn buffered_generation(state: &AppState, raw: RawGenerationRequest) -> Result<String, Error> {
    let request = normalize(raw, &state.config)?;
    tracing::info!(
        provider = %request.provider,
        model = %request.model,
        vision = request.is_vision(),
        "buffered generation"
    );

    let adapter = adapter_for(
        state.config.provider(request.provider).clone(),
        state.http.clone(),
    );
    adapter.generate(&request).await
}

async fn generate_stream(
    State(state): State<AppState>,
    Json(raw): Json<RawGenerationRequest>,
) -> Response {
    // SSE commits to HTTP 200 before the outcome is known, so even failures
    // that precede the upstream call are delivered as a terminal error frame.
    match streaming_generation(&state, raw).await {
        Ok(events) => encoder::sse_response(events),
        Err(error) => {
            tracing::warn!(%error, "stream setup failed");
            encoder::sse_response(futures_util::stream::iter(vec![GenerationEvent::Error {
                error: error.to_string(),
            }]))
        }
    }
}

async fn streaming_generation(
    state: &AppState,
    raw: RawGenerationRequest,
) -> Result<EventStream, Error> {
    let mut raw = raw;
    raw.stream = true;
    let request = normalize(raw, &state.config)?;
    tracing::info!(
        provider = %request.provider,
        model = %request.model,
        vision = request.is_vision(),
        "streaming generation"
    );

    let adapter = adapter_for(
        state.config.provider(request.provider).clone(),
        state.http.clone(),
    );
    let chunks = adapter.generate_stream(&request).await?;
    Ok(translate(chunks, adapter.chunk_parser()))
}

fn error_response(error: &Error) -> Response {
    let status = error.status();
    let body = Json(json!({
        "success": false,
        "error": error.to_string(),
        "status": status.as_u16(),
    }));
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_response_shape() {
        let response = error_response(&Error::validation("missing field model"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_response(&Error::unreachable("ollama", "refused"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
