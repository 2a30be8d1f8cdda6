//! Remedia HTTP Server
//!
//! Receives storage events and presign requests, and serves signed objects.

use anyhow::Result;
use remedia_server::{api, config::ServerConfig, state};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ServerConfig::load()?;

    init_tracing(&config.log_level)?;
    info!(
        host = %config.host,
        port = config.port,
        storage = ?config.storage,
        bucket = %config.pipeline.bucket,
        "Loaded configuration"
    );

    let app_state = state::init_state(&config)?;
    info!("Pipeline initialized");

    let app = api::create_router(app_state);

    // Start server
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("✓ Server listening on http://{}", addr);
    info!("  Health check: http://{}/health", addr);
    info!("  Events: POST http://{}/v1/events", addr);
    info!("  Presign: POST http://{}/v1/presign", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "remedia_server={level},remedia_pipeline={level},remedia_llm={level},tower_http=debug"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
