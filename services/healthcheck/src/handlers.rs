//! Read facade over the health snapshot

use axum::extract::State;
use axum::Json;
use tracing::info;
use types::health::HealthSnapshot;

use crate::error::AppError;
use crate::state::AppState;

/// `GET /checks` — the last-written snapshot, or an explicit not-found
/// before the first polling cycle has completed.
pub async fn get_checks(State(state): State<AppState>) -> Result<Json<HealthSnapshot>, AppError> {
    info!("get checks request received");

    let snapshot = state.health_store.load()?.ok_or(AppError::NoSnapshot)?;

    info!(services = snapshot.len(), "get checks request completed");
    Ok(Json(snapshot))
}
