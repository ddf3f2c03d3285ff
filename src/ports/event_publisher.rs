//! EventPublisher port - broker transport for relayed events.
//!
//! Only the outbox relay calls this port. Lifecycle handlers never publish
//! directly; they write to the outbox inside their unit of work.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for delivering events to the message broker.
///
/// Implementations must:
/// - deliver events sharing a partition key to one ordered partition
/// - bound every call in time, reporting a stall as an error
/// - tolerate redelivery (the relay is at-least-once)
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish several events in order, stopping at the first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
