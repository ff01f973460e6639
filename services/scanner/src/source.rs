//! Event source abstraction over the event log
//!
//! The scanner consumes through the `EventSource` trait so the detection
//! and persistence logic can be exercised without a broker. The production
//! implementation wraps an rdkafka `StreamConsumer` with manual offset
//! commits; an offset is committed only after the scanner says so.

use async_trait::async_trait;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use thiserror::Error;
use types::errors::PipelineError;

use crate::config::EventsConfig;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("event source closed")]
    Closed,
}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        PipelineError::Transport(err.to_string())
    }
}

/// One message pulled from the log, with enough position information to
/// commit it later.
#[derive(Debug, Clone)]
pub struct SourcedMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// A blocking pull + explicit commit view of the event log.
#[async_trait]
pub trait EventSource: Send {
    /// Receive the next message in delivery order.
    async fn recv(&mut self) -> Result<SourcedMessage, SourceError>;

    /// Advance the consumer-group position past `msg`.
    async fn commit(&mut self, msg: &SourcedMessage) -> Result<(), SourceError>;
}

/// Kafka-backed event source using a consumer group for resumable offsets.
pub struct KafkaEventSource {
    consumer: StreamConsumer,
}

impl KafkaEventSource {
    /// Connect and subscribe. Auto-commit is disabled: the group position
    /// advances only through `commit`, so a crash before commit replays
    /// the in-flight event. New groups start from the latest offset.
    pub fn connect(cfg: &EventsConfig) -> Result<Self, SourceError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", cfg.bootstrap_servers())
            .set("group.id", &cfg.consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .create()?;
        consumer.subscribe(&[&cfg.topic])?;
        Ok(Self { consumer })
    }
}

#[async_trait]
impl EventSource for KafkaEventSource {
    async fn recv(&mut self) -> Result<SourcedMessage, SourceError> {
        let msg = self.consumer.recv().await?;
        Ok(SourcedMessage {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            payload: msg.payload().map(|b| b.to_vec()).unwrap_or_default(),
        })
    }

    async fn commit(&mut self, msg: &SourcedMessage) -> Result<(), SourceError> {
        let mut positions = TopicPartitionList::new();
        positions.add_partition_offset(&msg.topic, msg.partition, Offset::Offset(msg.offset + 1))?;
        self.consumer.commit(&positions, CommitMode::Async)?;
        Ok(())
    }
}
