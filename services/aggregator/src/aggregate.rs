//! Periodic folding of windowed events into the cumulative snapshot
//!
//! Each cycle queries the upstream for buy and sell events in
//! `[last_updated, now)` and merges the deltas into the persisted snapshot.
//! The window start only advances when both queries succeed and the write
//! lands, so a failed cycle is retried over a grown window on the next
//! tick instead of losing data.

use std::time::Duration;

use chrono::{NaiveDateTime, Timelike, Utc};
use store::DocumentStore;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use types::errors::PipelineError;
use types::event::EventType;
use types::stats::StatsSnapshot;

use crate::upstream::{EventWindowQuery, PricedEvent};

/// Summary of one successful aggregation cycle, for logging.
#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub new_buy_events: u64,
    pub new_sell_events: u64,
}

/// Merge one side's window results into the snapshot.
///
/// An empty window leaves the side's maximum untouched; a previously
/// observed maximum must never be erased by a quiet interval.
pub fn fold_window(snapshot: &mut StatsSnapshot, side: EventType, events: &[PricedEvent]) {
    let count = events.len() as u64;
    let window_max = events
        .iter()
        .map(|e| e.price)
        .max_by(|a, b| a.total_cmp(b));

    match side {
        EventType::Buy => {
            snapshot.num_buy_events += count;
            if let Some(max) = window_max {
                snapshot.max_buy_price = snapshot.max_buy_price.max(max);
            }
        }
        EventType::Sell => {
            snapshot.num_sell_events += count;
            if let Some(max) = window_max {
                snapshot.max_sell_price = snapshot.max_sell_price.max(max);
            }
        }
    }
}

/// Run one aggregation cycle ending at `end`.
///
/// Both side queries must succeed before anything is written; on any
/// failure the snapshot (and with it the window start) stays put.
pub async fn run_cycle<Q: EventWindowQuery>(
    query: &Q,
    store: &DocumentStore<StatsSnapshot>,
    end: NaiveDateTime,
) -> Result<CycleReport, PipelineError> {
    let mut snapshot = store
        .load_or_else(StatsSnapshot::bootstrap)
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;
    let start = snapshot.last_updated;

    // A clock step backwards would otherwise rewind last_updated.
    if end <= start {
        warn!(%start, %end, "window is empty or inverted, nothing to fold");
        return Ok(CycleReport {
            window_start: start,
            window_end: start,
            new_buy_events: 0,
            new_sell_events: 0,
        });
    }

    let (buy_events, sell_events) = tokio::try_join!(
        query.events_in_window(EventType::Buy, start, end),
        query.events_in_window(EventType::Sell, start, end),
    )?;

    let report = CycleReport {
        window_start: start,
        window_end: end,
        new_buy_events: buy_events.len() as u64,
        new_sell_events: sell_events.len() as u64,
    };

    fold_window(&mut snapshot, EventType::Buy, &buy_events);
    fold_window(&mut snapshot, EventType::Sell, &sell_events);
    snapshot.last_updated = end;

    store
        .save(&snapshot)
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;

    Ok(report)
}

/// Current time at second precision, the wire granularity of the
/// upstream's window parameters.
pub fn window_end_now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Timer loop for the aggregator job.
///
/// The tick is awaited in the same task that runs the cycle and missed
/// ticks are skipped, so a slow cycle can never overlap with itself.
pub async fn run_scheduler<Q: EventWindowQuery>(
    query: Q,
    store: DocumentStore<StatsSnapshot>,
    period: Duration,
) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticks.tick().await;
        info!("periodic processing has started");

        match run_cycle(&query, &store, window_end_now()).await {
            Ok(report) => info!(
                new_buy_events = report.new_buy_events,
                new_sell_events = report.new_sell_events,
                window_end = %report.window_end,
                "periodic processing has completed"
            ),
            Err(err) => warn!(
                error = %err,
                action = ?err.action(),
                "aggregation cycle failed, window will be retried on the next tick"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;

    use crate::upstream::QueryError;

    /// Scripted upstream: per-side results, or a per-side failure.
    struct StubQuery {
        results: HashMap<&'static str, Vec<PricedEvent>>,
        failing_side: Option<EventType>,
    }

    impl StubQuery {
        fn new(buy: Vec<f64>, sell: Vec<f64>) -> Self {
            let mut results = HashMap::new();
            results.insert("buy", buy.into_iter().map(|price| PricedEvent { price }).collect());
            results.insert("sell", sell.into_iter().map(|price| PricedEvent { price }).collect());
            Self {
                results,
                failing_side: None,
            }
        }

        fn failing(mut self, side: EventType) -> Self {
            self.failing_side = Some(side);
            self
        }
    }

    #[async_trait]
    impl EventWindowQuery for StubQuery {
        async fn events_in_window(
            &self,
            side: EventType,
            _start: NaiveDateTime,
            _end: NaiveDateTime,
        ) -> Result<Vec<PricedEvent>, QueryError> {
            if self.failing_side == Some(side) {
                return Err(QueryError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            Ok(self.results[side.as_str()].clone())
        }
    }

    fn store_at(dir: &tempfile::TempDir) -> DocumentStore<StatsSnapshot> {
        DocumentStore::new(dir.path().join("stats.json"))
    }

    fn ts(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_first_cycle_bootstraps_and_commits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        let query = StubQuery::new(vec![10.0, 25.0], vec![99.0]);

        let end = ts("2024-10-03T11:00:00");
        let report = run_cycle(&query, &store, end).await.unwrap();
        assert_eq!(report.new_buy_events, 2);
        assert_eq!(report.new_sell_events, 1);

        let snap = store.load().unwrap().unwrap();
        assert_eq!(snap.num_buy_events, 2);
        assert_eq!(snap.max_buy_price, 25.0);
        assert_eq!(snap.num_sell_events, 1);
        assert_eq!(snap.max_sell_price, 99.0);
        assert_eq!(snap.last_updated, end);
    }

    #[tokio::test]
    async fn test_empty_window_carries_maxima_forward() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        store
            .save(&StatsSnapshot {
                num_buy_events: 5,
                max_buy_price: 120.0,
                num_sell_events: 3,
                max_sell_price: 450.0,
                last_updated: ts("2024-10-03T11:00:00"),
            })
            .unwrap();

        let query = StubQuery::new(vec![], vec![]);
        run_cycle(&query, &store, ts("2024-10-03T11:01:00"))
            .await
            .unwrap();

        let snap = store.load().unwrap().unwrap();
        assert_eq!(snap.num_buy_events, 5);
        assert_eq!(snap.max_buy_price, 120.0);
        assert_eq!(snap.max_sell_price, 450.0);
        assert_eq!(snap.last_updated, ts("2024-10-03T11:01:00"));
    }

    #[tokio::test]
    async fn test_lower_priced_window_never_lowers_maxima() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        store
            .save(&StatsSnapshot {
                num_buy_events: 1,
                max_buy_price: 120.0,
                num_sell_events: 1,
                max_sell_price: 450.0,
                last_updated: ts("2024-10-03T11:00:00"),
            })
            .unwrap();

        let query = StubQuery::new(vec![15.0], vec![80.0]);
        run_cycle(&query, &store, ts("2024-10-03T11:01:00"))
            .await
            .unwrap();

        let snap = store.load().unwrap().unwrap();
        assert_eq!(snap.num_buy_events, 2);
        assert_eq!(snap.max_buy_price, 120.0);
        assert_eq!(snap.max_sell_price, 450.0);
    }

    #[tokio::test]
    async fn test_failed_side_query_leaves_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        let before = StatsSnapshot {
            num_buy_events: 5,
            max_buy_price: 120.0,
            num_sell_events: 3,
            max_sell_price: 450.0,
            last_updated: ts("2024-10-03T11:00:00"),
        };
        store.save(&before).unwrap();

        let query = StubQuery::new(vec![10.0], vec![999.0]).failing(EventType::Sell);
        let err = run_cycle(&query, &store, ts("2024-10-03T11:01:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));

        // Nothing advanced: the same window (grown) is retried next tick.
        assert_eq!(store.load().unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_inverted_window_does_not_rewind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);
        let before = StatsSnapshot {
            num_buy_events: 5,
            max_buy_price: 120.0,
            num_sell_events: 3,
            max_sell_price: 450.0,
            last_updated: ts("2024-10-03T11:00:00"),
        };
        store.save(&before).unwrap();

        let query = StubQuery::new(vec![10.0], vec![20.0]);
        let report = run_cycle(&query, &store, ts("2024-10-03T10:00:00"))
            .await
            .unwrap();
        assert_eq!(report.new_buy_events, 0);
        assert_eq!(store.load().unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_successive_cycles_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);

        let query = StubQuery::new(vec![10.0], vec![100.0]);
        run_cycle(&query, &store, ts("2024-10-03T11:00:00"))
            .await
            .unwrap();

        let query = StubQuery::new(vec![50.0, 3.0], vec![]);
        run_cycle(&query, &store, ts("2024-10-03T11:01:00"))
            .await
            .unwrap();

        let snap = store.load().unwrap().unwrap();
        assert_eq!(snap.num_buy_events, 3);
        assert_eq!(snap.max_buy_price, 50.0);
        assert_eq!(snap.num_sell_events, 1);
        assert_eq!(snap.max_sell_price, 100.0);
        assert_eq!(snap.last_updated, ts("2024-10-03T11:01:00"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Folding any sequence of windows never decreases counts or
            /// maxima, regardless of window contents.
            #[test]
            fn fold_is_monotonic(windows in prop::collection::vec(
                prop::collection::vec(0.0f64..1000.0, 0..8),
                1..12,
            )) {
                let mut snapshot = StatsSnapshot::bootstrap();
                for window in windows {
                    let before = snapshot.clone();
                    let events: Vec<PricedEvent> =
                        window.into_iter().map(|price| PricedEvent { price }).collect();
                    fold_window(&mut snapshot, EventType::Buy, &events);

                    prop_assert!(snapshot.num_buy_events >= before.num_buy_events);
                    prop_assert!(snapshot.max_buy_price >= before.max_buy_price);
                    if events.is_empty() {
                        prop_assert_eq!(snapshot.max_buy_price, before.max_buy_price);
                    }
                }
            }
        }
    }
}
