//! Threshold rules for anomaly classification
//!
//! The pairing of rule to event side is the business policy: sell prices
//! trip the high rule, buy prices the low rule. Both boundaries are
//! inclusive. Rules are evaluated in this fixed order.

use chrono::NaiveDateTime;
use serde::Deserialize;
use types::anomaly::{AnomalyRecord, AnomalyType};
use types::event::{EventType, MarketEvent};

/// Price thresholds for anomaly classification.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Thresholds {
    pub high_value: f64,
    pub low_value: f64,
}

/// Classify one event against the thresholds.
pub fn evaluate(event: &MarketEvent, thresholds: &Thresholds) -> Option<AnomalyType> {
    let price = event.payload.price;
    match event.event_type {
        EventType::Sell if price >= thresholds.high_value => Some(AnomalyType::TooHigh),
        EventType::Buy if price <= thresholds.low_value => Some(AnomalyType::TooLow),
        _ => None,
    }
}

/// Build the persisted record for a qualifying event.
pub fn build_record(
    event: &MarketEvent,
    kind: AnomalyType,
    thresholds: &Thresholds,
    detected_at: NaiveDateTime,
) -> AnomalyRecord {
    let price = event.payload.price;
    let description = match kind {
        AnomalyType::TooHigh => {
            format!(
                "Sell price too high: {} exceeds {}",
                price, thresholds.high_value
            )
        }
        AnomalyType::TooLow => {
            format!(
                "Buy price too low: {} falls below {}",
                price, thresholds.low_value
            )
        }
    };

    AnomalyRecord {
        event_id: event.payload.user_id.clone(),
        trace_id: event.payload.trace_id.clone(),
        event_type: event.event_type,
        anomaly_type: kind,
        description,
        timestamp: detected_at,
    }
}
