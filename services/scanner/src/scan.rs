//! The anomaly scanning loop
//!
//! Consumes one event at a time in delivery order. A qualifying event is
//! appended to the persisted collection, and the source position is
//! committed only after the write succeeds. A failed write therefore holds
//! the checkpoint: the event is redelivered on restart and no anomaly is
//! dropped silently. Duplicates are possible only for the event whose
//! commit never happened.

use std::time::Duration;

use chrono::Utc;
use store::{DocumentStore, StoreError};
use tracing::{error, info, warn};
use types::anomaly::{AnomalyRecord, AnomalyType};
use types::errors::{FailureAction, PipelineError};
use types::event::MarketEvent;

use crate::rules::{self, Thresholds};
use crate::source::{EventSource, SourcedMessage};

const TRANSPORT_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to a single consumed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The event tripped a rule and its record is durably stored.
    Flagged(AnomalyType),
    /// The event was evaluated and passed.
    Clean,
    /// The payload could not be decoded; the event was skipped.
    Skipped,
}

pub struct Scanner<S: EventSource> {
    source: S,
    thresholds: Thresholds,
    store: DocumentStore<Vec<AnomalyRecord>>,
    /// In-memory view of the collection, read once per session.
    anomalies: Vec<AnomalyRecord>,
    /// True while the in-memory collection is ahead of the document on disk.
    dirty: bool,
}

impl<S: EventSource> Scanner<S> {
    /// Resume a scanning session: load the full collection once, then
    /// append to it for the lifetime of the task.
    pub fn new(
        source: S,
        thresholds: Thresholds,
        store: DocumentStore<Vec<AnomalyRecord>>,
    ) -> Result<Self, StoreError> {
        let anomalies = store.load_or_else(Vec::new)?;
        info!(existing = anomalies.len(), "anomaly collection loaded");
        Ok(Self {
            source,
            thresholds,
            store,
            anomalies,
            dirty: false,
        })
    }

    /// Run for the process lifetime. Failures are mapped through the
    /// failure policy; none of them end the loop.
    pub async fn run(mut self) {
        loop {
            match self.step().await {
                Ok(_) => {}
                Err(err) => match err.action() {
                    FailureAction::RetryNextTick => {
                        warn!(error = %err, "event source failure, backing off");
                        tokio::time::sleep(TRANSPORT_BACKOFF).await;
                    }
                    FailureAction::BlockAdvancement => {
                        error!(error = %err, "checkpoint held, event will be re-attempted");
                    }
                    FailureAction::SkipAndContinue => {
                        warn!(error = %err, "unit of work skipped");
                    }
                },
            }
        }
    }

    /// Consume and settle exactly one message.
    ///
    /// Returns `Err` when the message's position was NOT committed
    /// (transport failure or a blocked persist).
    pub(crate) async fn step(&mut self) -> Result<ScanOutcome, PipelineError> {
        let msg = self.source.recv().await?;

        let outcome = match decode_event(&msg) {
            Ok(event) => match rules::evaluate(&event, &self.thresholds) {
                Some(kind) => {
                    let record =
                        rules::build_record(&event, kind, &self.thresholds, Utc::now().naive_utc());
                    info!(
                        trace_id = %record.trace_id,
                        anomaly_type = %kind,
                        price = event.payload.price,
                        "anomaly detected"
                    );
                    self.anomalies.push(record);
                    self.dirty = true;
                    ScanOutcome::Flagged(kind)
                }
                None => ScanOutcome::Clean,
            },
            Err(err) => {
                // A malformed payload must not stall the stream.
                warn!(error = %err, offset = msg.offset, "skipping undecodable event");
                ScanOutcome::Skipped
            }
        };

        // Commit is gated on the document being durably in sync. While a
        // previous write is still outstanding, later offsets must not
        // advance either, or a restart would lose the pending record.
        if self.dirty {
            self.store
                .save(&self.anomalies)
                .map_err(|e| PipelineError::Persistence(e.to_string()))?;
            self.dirty = false;
        }

        self.source.commit(&msg).await?;
        Ok(outcome)
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }
}

fn decode_event(msg: &SourcedMessage) -> Result<MarketEvent, PipelineError> {
    serde_json::from_slice(&msg.payload).map_err(|e| PipelineError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::source::SourceError;

    const THRESHOLDS: Thresholds = Thresholds {
        high_value: 500.0,
        low_value: 5.0,
    };

    /// In-memory event source: a fixed script of messages plus a record of
    /// committed offsets.
    struct ScriptedSource {
        queue: VecDeque<SourcedMessage>,
        committed: Vec<i64>,
    }

    impl ScriptedSource {
        fn new(payloads: Vec<Vec<u8>>) -> Self {
            let queue = payloads
                .into_iter()
                .enumerate()
                .map(|(i, payload)| SourcedMessage {
                    topic: "events".into(),
                    partition: 0,
                    offset: i as i64,
                    payload,
                })
                .collect();
            Self {
                queue,
                committed: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn recv(&mut self) -> Result<SourcedMessage, SourceError> {
            self.queue.pop_front().ok_or(SourceError::Closed)
        }

        async fn commit(&mut self, msg: &SourcedMessage) -> Result<(), SourceError> {
            self.committed.push(msg.offset);
            Ok(())
        }
    }

    fn event_payload(event_type: &str, price: f64) -> Vec<u8> {
        json!({
            "type": event_type,
            "timestamp": "2024-10-03T11:03:00",
            "payload": {
                "user_id": "u-1",
                "trace_id": format!("t-{price}"),
                "price": price,
                "book_id": "b-1"
            }
        })
        .to_string()
        .into_bytes()
    }

    fn store_at(dir: &tempfile::TempDir) -> DocumentStore<Vec<AnomalyRecord>> {
        DocumentStore::new(dir.path().join("anomalies.json"))
    }

    #[tokio::test]
    async fn test_flagged_event_is_persisted_then_committed() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(vec![event_payload("sell", 900.0)]);
        let mut scanner = Scanner::new(source, THRESHOLDS, store_at(&dir)).unwrap();

        let outcome = scanner.step().await.unwrap();
        assert_eq!(outcome, ScanOutcome::Flagged(AnomalyType::TooHigh));
        assert_eq!(scanner.source().committed, vec![0]);

        let persisted = store_at(&dir).load().unwrap().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].anomaly_type, AnomalyType::TooHigh);
    }

    #[tokio::test]
    async fn test_clean_event_commits_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(vec![event_payload("sell", 100.0)]);
        let mut scanner = Scanner::new(source, THRESHOLDS, store_at(&dir)).unwrap();

        let outcome = scanner.step().await.unwrap();
        assert_eq!(outcome, ScanOutcome::Clean);
        assert_eq!(scanner.source().committed, vec![0]);
        assert!(!store_at(&dir).exists());
    }

    #[tokio::test]
    async fn test_undecodable_event_is_skipped_not_stalled() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(vec![
            b"{not json".to_vec(),
            event_payload("buy", 1.0),
        ]);
        let mut scanner = Scanner::new(source, THRESHOLDS, store_at(&dir)).unwrap();

        assert_eq!(scanner.step().await.unwrap(), ScanOutcome::Skipped);
        assert_eq!(
            scanner.step().await.unwrap(),
            ScanOutcome::Flagged(AnomalyType::TooLow)
        );
        assert_eq!(scanner.source().committed, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_persist_failure_holds_the_checkpoint() {
        // Parent path is a regular file, so every save fails.
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let store: DocumentStore<Vec<AnomalyRecord>> =
            DocumentStore::new(blocker.path().join("anomalies.json"));

        let source = ScriptedSource::new(vec![
            event_payload("sell", 900.0),
            event_payload("buy", 100.0),
        ]);
        let mut scanner = Scanner::new(source, THRESHOLDS, store).unwrap();

        let err = scanner.step().await.unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert_eq!(err.action(), FailureAction::BlockAdvancement);

        // The following clean event must not advance the position either:
        // its commit would silently drop the unpersisted record.
        let err = scanner.step().await.unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert!(scanner.source().committed.is_empty());

        // The record stays in memory, pending a successful write.
        assert_eq!(scanner.anomalies.len(), 1);
    }

    #[tokio::test]
    async fn test_resumed_session_appends_to_existing_collection() {
        let dir = tempfile::tempdir().unwrap();

        let source = ScriptedSource::new(vec![event_payload("sell", 900.0)]);
        let mut scanner = Scanner::new(source, THRESHOLDS, store_at(&dir)).unwrap();
        scanner.step().await.unwrap();
        drop(scanner);

        // Restart: a new session loads the collection and keeps appending.
        let source = ScriptedSource::new(vec![event_payload("buy", 2.0)]);
        let mut scanner = Scanner::new(source, THRESHOLDS, store_at(&dir)).unwrap();
        scanner.step().await.unwrap();

        let persisted = store_at(&dir).load().unwrap().unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].anomaly_type, AnomalyType::TooHigh);
        assert_eq!(persisted[1].anomaly_type, AnomalyType::TooLow);
    }

    #[tokio::test]
    async fn test_source_exhaustion_surfaces_as_transport_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new(vec![]);
        let mut scanner = Scanner::new(source, THRESHOLDS, store_at(&dir)).unwrap();

        let err = scanner.step().await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
        assert_eq!(err.action(), FailureAction::RetryNextTick);
    }
}
