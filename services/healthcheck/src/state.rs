use std::sync::Arc;

use store::DocumentStore;
use types::health::HealthSnapshot;

#[derive(Clone)]
pub struct AppState {
    /// Read-only handle; the polling task is the snapshot's only writer.
    pub health_store: Arc<DocumentStore<HealthSnapshot>>,
}
