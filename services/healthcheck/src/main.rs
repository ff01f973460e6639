mod config;
mod error;
mod handlers;
mod poll;
mod router;
mod state;

use std::sync::Arc;

use store::DocumentStore;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use config::HealthcheckConfig;
use poll::run_scheduler;
use router::create_router;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = HealthcheckConfig::load()?;
    tracing::info!(
        dependencies = cfg.dependencies.len(),
        timeout_sec = cfg.threshold.timeout_sec,
        period_sec = cfg.scheduler.period_sec,
        data_store = %cfg.data_store.filename.display(),
        "Starting Health Aggregator service"
    );

    let client = reqwest::Client::new();
    let writer_store = DocumentStore::new(&cfg.data_store.filename);
    tokio::spawn(run_scheduler(
        client,
        cfg.dependencies.clone(),
        cfg.threshold.timeout(),
        writer_store,
        cfg.scheduler.period(),
    ));

    let state = AppState {
        health_store: Arc::new(DocumentStore::new(&cfg.data_store.filename)),
    };
    let app = create_router(state);

    let listener = TcpListener::bind(&cfg.server.bind).await?;
    tracing::info!("Listening on {}", cfg.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
