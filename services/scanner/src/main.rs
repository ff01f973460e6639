mod config;
mod error;
mod handlers;
mod router;
mod rules;
mod scan;
mod source;
mod state;

use std::sync::Arc;

use store::DocumentStore;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use config::ScannerConfig;
use router::create_router;
use scan::Scanner;
use source::KafkaEventSource;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = ScannerConfig::load()?;
    tracing::info!(
        high_value = cfg.thresholds.high_value,
        low_value = cfg.thresholds.low_value,
        topic = %cfg.events.topic,
        data_store = %cfg.data_store.filename.display(),
        "Starting Anomaly Scanner service"
    );

    // Bootstrap an empty collection so readers never hit a missing file.
    let writer_store = DocumentStore::new(&cfg.data_store.filename);
    if !writer_store.exists() {
        tracing::info!(path = %cfg.data_store.filename.display(), "Creating anomaly data store");
        writer_store.save(&Vec::new())?;
    }

    let source = KafkaEventSource::connect(&cfg.events)?;
    let scanner = Scanner::new(source, cfg.thresholds, writer_store)?;
    tokio::spawn(scanner.run());

    // The facade reads through its own handle; the scanner task is the
    // store's only writer.
    let state = AppState {
        anomaly_store: Arc::new(DocumentStore::new(&cfg.data_store.filename)),
    };
    let app = create_router(state);

    let listener = TcpListener::bind(&cfg.server.bind).await?;
    tracing::info!("Listening on {}", cfg.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
