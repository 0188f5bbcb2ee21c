use anyhow::{Context, Result};
use api::{router, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;

    // Initialize tracing
    api::telemetry::init_tracing(&config.logging);

    let addr = config.server.addr.clone();
    tracing::info!(
        preview_chars = config.aggregation.preview_chars,
        sample_entities = config.aggregation.sample_entities,
        cache_entries = config.cache.max_entries,
        "Loaded configuration"
    );

    let app = router(AppState::new(config));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
