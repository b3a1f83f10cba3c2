use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use encore_api::jobs::JobRegistry;
use encore_api::state::AppState;
use encore_api::{router, telemetry};
use encore_core::Config;
use encore_storage::LocalStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_telemetry();

    let config = Config::from_env().context("Invalid configuration")?;
    tracing::info!(
        environment = %config.environment,
        media_root = %config.media_root,
        "Starting encore media service"
    );

    let storage = LocalStorage::new(&config.media_root, config.public_base_url.clone())
        .await
        .context("Failed to initialize media storage")?;

    let jobs = JobRegistry::new();
    jobs.spawn_sweeper(
        Duration::from_secs(config.job_sweep_interval_secs),
        Duration::from_secs(config.job_retention_secs),
    );

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = Arc::new(AppState::new(config, Arc::new(storage), jobs));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
