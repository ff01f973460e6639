use std::sync::Arc;

use store::DocumentStore;
use types::anomaly::AnomalyRecord;

#[derive(Clone)]
pub struct AppState {
    /// Read-only handle; the scanner task is the collection's only writer.
    pub anomaly_store: Arc<DocumentStore<Vec<AnomalyRecord>>>,
}
