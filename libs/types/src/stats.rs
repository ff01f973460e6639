//! Cumulative statistics snapshot
//!
//! Owned exclusively by the stats aggregator. Counts and maxima only ever
//! grow; `last_updated` marks the end of the last successfully folded
//! window and doubles as the next window's start.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persisted cumulative statistics document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub num_buy_events: u64,
    pub max_buy_price: f64,
    pub num_sell_events: u64,
    pub max_sell_price: f64,
    pub last_updated: NaiveDateTime,
}

impl StatsSnapshot {
    /// Bootstrap state for the very first aggregation run: zero counts,
    /// zero maxima, and the epoch as the window start.
    pub fn bootstrap() -> Self {
        Self {
            num_buy_events: 0,
            max_buy_price: 0.0,
            num_sell_events: 0,
            max_sell_price: 0.0,
            last_updated: DateTime::<Utc>::UNIX_EPOCH.naive_utc(),
        }
    }
}
