//! Redis Streams publisher for state-change events.
//!
//! Each event is appended with `XADD` to `<prefix>.<partition>`, where the
//! partition is derived from the envelope's partition key (the user id). A
//! user's events therefore always land on the same stream, in relay order.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use sha2::{Digest, Sha256};

use crate::config::RedisConfig;
use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// Picks the stream partition for a key.
///
/// Stable across processes and restarts: the first eight bytes of the
/// SHA-256 digest, reduced modulo `partitions`.
pub fn partition_for(key: &str, partitions: u32) -> u32 {
    if partitions <= 1 {
        return 0;
    }
    let digest = Sha256::digest(key.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % u64::from(partitions)) as u32
}

/// Publishes envelopes to partitioned Redis streams.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    conn: MultiplexedConnection,
    stream_prefix: String,
    partitions: u32,
    timeout: Duration,
}

impl RedisStreamPublisher {
    pub fn new(conn: MultiplexedConnection, config: &RedisConfig) -> Self {
        Self {
            conn,
            stream_prefix: config.stream_prefix.clone(),
            partitions: config.partitions.max(1),
            timeout: config.publish_timeout(),
        }
    }

    /// Opens a multiplexed connection and builds the publisher.
    pub async fn connect(config: &RedisConfig) -> Result<Self, DomainError> {
        let client = redis::Client::open(config.url.as_str()).map_err(broker_error)?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(broker_error)?;
        Ok(Self::new(conn, config))
    }

    /// Stream an event with this partition key is written to.
    pub fn stream_for(&self, partition_key: &str) -> String {
        stream_name(&self.stream_prefix, partition_for(partition_key, self.partitions))
    }
}

fn stream_name(prefix: &str, partition: u32) -> String {
    format!("{}.{}", prefix, partition)
}

fn broker_error(e: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::MessageBrokerError, e.to_string())
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let stream = self.stream_for(event.partition_key());
        let body = serde_json::to_string(&event).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("Failed to encode event {}: {}", event.event_id, e),
            )
        })?;

        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&stream)
            .arg("*")
            .arg("event_id")
            .arg(event.event_id.as_str())
            .arg("event_type")
            .arg(&event.event_type)
            .arg("payload")
            .arg(body);

        let entry_id: String = tokio::time::timeout(self.timeout, cmd.query_async(&mut conn))
            .await
            .map_err(|_| {
                DomainError::new(
                    ErrorCode::MessageBrokerError,
                    format!("XADD to {} timed out after {:?}", stream, self.timeout),
                )
            })?
            .map_err(broker_error)?;

        tracing::debug!(
            event_id = %event.event_id,
            stream = %stream,
            entry_id = %entry_id,
            "event appended to stream"
        );
        Ok(())
    }
}
