use llm_gateway::{router, AppState, GatewayConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env();
    tracing::info!(
        ollama = %config.ollama.base_url,
        ollama_enabled = config.ollama.enabled,
        lmstudio = %config.lmstudio.base_url,
        lmstudio_enabled = config.lmstudio.enabled,
        "provider configuration loaded"
    );

    let addr = std::env::var("GATEWAY_ADDR").unwrap_or_else(|_| "127.0.0.1:8189".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, router(AppState::new(config))).await?;
    Ok(())
}
