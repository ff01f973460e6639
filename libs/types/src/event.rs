//! Market events as published to the event log
//!
//! Events are produced by the ingestion gateway and consumed here; the
//! pipeline never mutates them. Required fields are validated at decode
//! time so downstream code can trust the structure.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Side of a market event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Buy,
    Sell,
}

impl EventType {
    /// Lowercase wire spelling, as used in topic payloads and query paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Buy => "buy",
            EventType::Sell => "sell",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a market event.
///
/// Only the fields the pipeline evaluates are modelled; anything else the
/// gateway attached (book name, quantities, ...) is carried through opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub user_id: String,
    pub trace_id: String,
    pub price: f64,
    pub book_id: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single market event as it appears on the event log.
///
/// The gateway historically stamped the timestamp under a `datetime` key;
/// both spellings are accepted on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(alias = "datetime")]
    pub timestamp: NaiveDateTime,
    pub payload: EventPayload,
}
