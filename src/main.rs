//! Alzheimer's Risk Predictor Backend - Main Entry Point
//!
//! Caches and loads the pipeline artifact, then serves the prediction API.

use alzheimers_risk_backend::{
    api::{construct_router, AppState},
    artifact,
    config::AppConfig,
    logging,
};
use anyhow::{Context, Result};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    logging::init(&config.logging)?;

    info!("Starting Alzheimer's Risk Predictor Backend");
    info!(
        provider = ?config.storage.provider,
        bucket = %config.storage.bucket_name,
        key = %config.storage.pipeline_filename,
        path = %config.storage.local_pipeline_path.display(),
        "Configuration loaded"
    );

    let pipeline = artifact::bootstrap(&config).await;
    if !pipeline.is_available() {
        warn!("Serving without a pipeline; /predict will answer 'Model not loaded'");
    }

    let app = construct_router(AppState::new(pipeline));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
