//! In-memory event bus for tests and local runs.
//!
//! Captures everything the outbox relay publishes so tests can assert on
//! delivered order. Delivery can be switched off per partition key to
//! exercise the relay's retry path.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// In-memory event bus.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// let relay = OutboxPublisher::new(store, bus.clone());
/// relay.poll_once().await?;
///
/// assert_eq!(bus.event_count(), 1);
/// assert!(bus.has_event("accreditation.state_changed.v1"));
/// ```
pub struct InMemoryEventBus {
    published: RwLock<Vec<EventEnvelope>>,
    unavailable_keys: RwLock<HashSet<String>>,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            unavailable_keys: RwLock::new(HashSet::new()),
        }
    }

    // === Test Helpers ===

    /// Returns all published events in delivery order.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Returns events for a specific aggregate.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    /// Returns events routed under a partition key.
    pub fn events_for_partition(&self, partition_key: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.partition_key() == partition_key)
            .collect()
    }

    /// Clears all published events.
    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Returns count of published events.
    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Checks if a specific event type was published.
    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|e| e.event_type == event_type)
    }

    /// Rejects every publish for `partition_key` until re-enabled.
    pub fn set_unavailable(&self, partition_key: &str, unavailable: bool) {
        let mut keys = self
            .unavailable_keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if unavailable {
            keys.insert(partition_key.to_string());
        } else {
            keys.remove(partition_key);
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let unavailable = self
            .unavailable_keys
            .read()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "event bus lock poisoned"))?
            .contains(event.partition_key());
        if unavailable {
            return Err(DomainError::new(
                ErrorCode::MessageBrokerError,
                format!("partition {} unavailable", event.partition_key()),
            ));
        }

        self.published
            .write()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "event bus lock poisoned"))?
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_envelope(event_type: &str, aggregate_id: &str, user: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, aggregate_id, "Accreditation", json!({})).with_user_id(user)
    }

    #[tokio::test]
    async fn publish_stores_event() {
        let bus = InMemoryEventBus::new();

        bus.publish(test_envelope("accreditation.state_changed.v1", "acc-1", "U1"))
            .await
            .unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("accreditation.state_changed.v1"));
    }

    #[tokio::test]
    async fn filters_by_type_aggregate_and_partition() {
        let bus = InMemoryEventBus::new();

        bus.publish(test_envelope("type.a", "acc-1", "U1")).await.unwrap();
        bus.publish(test_envelope("type.b", "acc-2", "U2")).await.unwrap();
        bus.publish(test_envelope("type.a", "acc-1", "U1")).await.unwrap();

        assert_eq!(bus.events_of_type("type.a").len(), 2);
        assert_eq!(bus.events_for_aggregate("acc-2").len(), 1);
        assert_eq!(bus.events_for_partition("U1").len(), 2);
    }

    #[tokio::test]
    async fn unavailable_partition_rejects_until_restored() {
        let bus = InMemoryEventBus::new();
        bus.set_unavailable("U1", true);

        let result = bus.publish(test_envelope("type.a", "acc-1", "U1")).await;
        assert_eq!(result.unwrap_err().code, ErrorCode::MessageBrokerError);
        bus.publish(test_envelope("type.a", "acc-2", "U2")).await.unwrap();

        bus.set_unavailable("U1", false);
        bus.publish(test_envelope("type.a", "acc-1", "U1")).await.unwrap();

        assert_eq!(bus.event_count(), 2);
    }

    #[tokio::test]
    async fn publish_all_keeps_order() {
        let bus = InMemoryEventBus::new();

        let events = vec![
            test_envelope("type.a", "1", "U1"),
            test_envelope("type.b", "2", "U1"),
            test_envelope("type.c", "3", "U1"),
        ];
        bus.publish_all(events).await.unwrap();

        let types: Vec<_> = bus
            .published_events()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(types, vec!["type.a", "type.b", "type.c"]);
    }

    #[tokio::test]
    async fn clear_removes_all_events() {
        let bus = InMemoryEventBus::new();

        bus.publish(test_envelope("type.a", "1", "U1")).await.unwrap();
        bus.clear();

        assert_eq!(bus.event_count(), 0);
    }
}
