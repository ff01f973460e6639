//! Anomaly classification and persisted anomaly records
//!
//! One record per qualifying source event; records are append-only and the
//! scanner is their only writer.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::event::EventType;

/// Classification of a flagged event.
///
/// Persisted documents use the historical spaced spelling ("Too High");
/// query paths use the compact one ("TooHigh"). `FromStr` accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyType {
    #[serde(rename = "Too High")]
    TooHigh,
    #[serde(rename = "Too Low")]
    TooLow,
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyType::TooHigh => f.write_str("Too High"),
            AnomalyType::TooLow => f.write_str("Too Low"),
        }
    }
}

/// Error returned when a query names an unknown anomaly type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown anomaly type: {0}")]
pub struct UnknownAnomalyType(pub String);

impl FromStr for AnomalyType {
    type Err = UnknownAnomalyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TooHigh" | "Too High" => Ok(AnomalyType::TooHigh),
            "TooLow" | "Too Low" => Ok(AnomalyType::TooLow),
            other => Err(UnknownAnomalyType(other.to_string())),
        }
    }
}

/// A persisted anomaly record, created once per qualifying event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub event_id: String,
    pub trace_id: String,
    pub event_type: EventType,
    pub anomaly_type: AnomalyType,
    pub description: String,
    pub timestamp: NaiveDateTime,
}
