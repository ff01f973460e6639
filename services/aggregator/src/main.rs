mod aggregate;
mod config;
mod error;
mod handlers;
mod router;
mod state;
mod upstream;

use std::sync::Arc;

use store::DocumentStore;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use aggregate::run_scheduler;
use config::AggregatorConfig;
use router::create_router;
use state::AppState;
use upstream::HttpEventWindowQuery;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = AggregatorConfig::load()?;
    tracing::info!(
        eventstore = %cfg.eventstore.url,
        period_sec = cfg.scheduler.period_sec,
        datastore = %cfg.datastore.filename.display(),
        "Starting Stats Aggregator service"
    );

    let client = reqwest::Client::builder()
        .timeout(cfg.eventstore.timeout())
        .build()?;
    let query = HttpEventWindowQuery::new(client, cfg.eventstore.url.clone());

    let writer_store = DocumentStore::new(&cfg.datastore.filename);
    tokio::spawn(run_scheduler(query, writer_store, cfg.scheduler.period()));

    let state = AppState {
        stats_store: Arc::new(DocumentStore::new(&cfg.datastore.filename)),
    };
    let app = create_router(state);

    let listener = TcpListener::bind(&cfg.server.bind).await?;
    tracing::info!("Listening on {}", cfg.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
