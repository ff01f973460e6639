//! Read facade over the persisted anomaly collection
//!
//! Pure projection: the handler filters and sorts, never mutates.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};
use types::anomaly::{AnomalyRecord, AnomalyType};

use crate::error::AppError;
use crate::state::AppState;

/// Response body for `GET /anomalies/{type}`.
///
/// A recognized type returns the bare sorted array; an unrecognized type
/// returns an informative empty-result object instead of an error.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnomaliesResponse {
    Matches(Vec<AnomalyRecord>),
    Empty {
        anomalies: Vec<AnomalyRecord>,
        message: String,
    },
}

pub async fn get_anomalies(
    State(state): State<AppState>,
    Path(requested): Path<String>,
) -> Result<Json<AnomaliesResponse>, AppError> {
    info!(anomaly_type = %requested, "get anomalies request received");

    let kind: AnomalyType = match requested.parse() {
        Ok(kind) => kind,
        Err(err) => {
            warn!(error = %err, "unrecognized anomaly type requested");
            return Ok(Json(AnomaliesResponse::Empty {
                anomalies: Vec::new(),
                message: "No anomalies detected.".to_string(),
            }));
        }
    };

    let mut records: Vec<AnomalyRecord> = state
        .anomaly_store
        .load()?
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.anomaly_type == kind)
        .collect();

    // Most recent first.
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    info!(matches = records.len(), "get anomalies request completed");
    Ok(Json(AnomaliesResponse::Matches(records)))
}
