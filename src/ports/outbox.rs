//! Transactional outbox port.
//!
//! Lifecycle handlers write an `OutboxEntry` through their
//! `AccreditationTransaction`, in the same commit as the status change. The
//! `OutboxPublisher` relay then reads pending entries through `OutboxStore`
//! and hands them to the broker `EventPublisher`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, EventEnvelope, ValidationError};

/// Status of an outbox entry in the delivery pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Written, not yet delivered.
    Pending,
    /// Accepted by the broker.
    Published,
    /// Last delivery attempt failed; retried on the next poll.
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Published => "published",
            OutboxStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "published" => Ok(OutboxStatus::Published),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "outbox_status",
                format!("unknown outbox status '{}'", other),
            )),
        }
    }
}

/// An entry in the event outbox table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: Uuid,

    pub event: EventEnvelope,

    pub status: OutboxStatus,

    pub created_at: DateTime<Utc>,

    /// When the entry was last published or failed.
    pub processed_at: Option<DateTime<Utc>>,

    pub attempts: u32,

    pub last_error: Option<String>,

    /// Events sharing a key are delivered in write order (the user id).
    pub partition_key: String,
}

impl OutboxEntry {
    /// Creates a pending entry keyed by the envelope's partition key.
    pub fn for_event(event: EventEnvelope) -> Self {
        let partition_key = event.partition_key().to_string();
        Self::new(event, partition_key)
    }

    /// Creates a new pending outbox entry for an event.
    pub fn new(event: EventEnvelope, partition_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            status: OutboxStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            attempts: 0,
            last_error: None,
            partition_key: partition_key.into(),
        }
    }

    /// Mark the entry as successfully published.
    pub fn mark_published(&mut self) {
        self.status = OutboxStatus::Published;
        self.processed_at = Some(Utc::now());
        self.attempts += 1;
    }

    /// Mark the entry as failed with an error.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = OutboxStatus::Failed;
        self.processed_at = Some(Utc::now());
        self.attempts += 1;
        self.last_error = Some(error.into());
    }
}

/// Relay side of the outbox.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Returns up to `limit` undelivered entries (pending or failed),
    /// oldest first.
    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError>;

    /// Marks an entry as delivered.
    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError>;

    /// Records a failed delivery attempt.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError>;

    /// Deletes published entries processed more than `older_than_hours` ago.
    ///
    /// Returns the number of entries removed.
    async fn cleanup_old(&self, older_than_hours: u32) -> Result<u64, DomainError>;
}
