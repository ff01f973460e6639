//! Upstream windowed event queries
//!
//! The aggregator never reads the event log directly; it asks the event
//! store's query interface for buy and sell events inside a half-open
//! window. Whether the upstream treats `start_timestamp` as inclusive or
//! exclusive is its contract, not ours; overlap at the edge is an accepted
//! risk of the retry design.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;
use types::errors::PipelineError;
use types::event::EventType;

/// Wire timestamp format used by the query interface.
const WINDOW_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),
}

impl From<QueryError> for PipelineError {
    fn from(err: QueryError) -> Self {
        PipelineError::Transport(err.to_string())
    }
}

/// The slice of an upstream event the aggregator folds: its price.
/// Everything else in the result rows is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PricedEvent {
    pub price: f64,
}

/// Windowed query interface over the upstream event store.
#[async_trait]
pub trait EventWindowQuery: Send + Sync {
    /// All events of `side` in `[start, end)`.
    async fn events_in_window(
        &self,
        side: EventType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricedEvent>, QueryError>;
}

/// HTTP implementation against
/// `GET {base}/books/{side}?start_timestamp=..&end_timestamp=..`.
pub struct HttpEventWindowQuery {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEventWindowQuery {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }
}

#[async_trait]
impl EventWindowQuery for HttpEventWindowQuery {
    async fn events_in_window(
        &self,
        side: EventType,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricedEvent>, QueryError> {
        let url = format!("{}/books/{}", self.base_url, side);
        let response = self
            .client
            .get(&url)
            .query(&[
                (
                    "start_timestamp",
                    start.format(WINDOW_TIMESTAMP_FORMAT).to_string(),
                ),
                (
                    "end_timestamp",
                    end.format(WINDOW_TIMESTAMP_FORMAT).to_string(),
                ),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueryError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}
