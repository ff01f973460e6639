use std::sync::Arc;

use store::DocumentStore;
use types::stats::StatsSnapshot;

#[derive(Clone)]
pub struct AppState {
    /// Read-only handle; the scheduler task is the snapshot's only writer.
    pub stats_store: Arc<DocumentStore<StatsSnapshot>>,
}
