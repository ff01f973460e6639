//! Read facade over the cumulative statistics snapshot

use axum::extract::State;
use axum::Json;
use tracing::info;
use types::stats::StatsSnapshot;

use crate::error::AppError;
use crate::state::AppState;

/// `GET /stats` — the current snapshot verbatim, or an explicit not-found
/// when no aggregation run has ever committed. A zeroed default body must
/// never masquerade as data.
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsSnapshot>, AppError> {
    info!("get stats request received");

    let snapshot = state.stats_store.load()?.ok_or(AppError::NoSnapshot)?;

    info!(
        num_buy_events = snapshot.num_buy_events,
        num_sell_events = snapshot.num_sell_events,
        "get stats request completed"
    );
    Ok(Json(snapshot))
}
