//! OutboxPublisher - Background relay for reliable event delivery.
//!
//! Second half of the transactional outbox:
//! 1. Lifecycle handlers write the state-change event to the outbox in the
//!    same transaction as the status change
//! 2. **OutboxPublisher polls the outbox and publishes to the broker** (this module)
//!
//! Delivery is at-least-once. Entries are relayed oldest first; once an
//! entry for a partition key fails, later entries for that key are held back
//! until the next poll so a user's events never overtake each other.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 100ms | How often to check for undelivered events |
//! | `batch_size` | 100 | Max events to relay per poll cycle |
//! | `cleanup_interval` | 1h | How often published entries are pruned |
//! | `retention_hours` | 168 | Age after which published entries are pruned |
//!
//! ## Graceful Shutdown
//!
//! The relay listens for a shutdown signal and drains one final batch before
//! stopping.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::config::OutboxConfig;
use crate::domain::foundation::DomainError;
use crate::ports::{EventPublisher, OutboxStore};

/// Configuration for the OutboxPublisher service.
#[derive(Debug, Clone)]
pub struct OutboxPublisherConfig {
    /// How often to poll for undelivered events.
    pub poll_interval: Duration,

    /// Maximum events to process per poll cycle.
    pub batch_size: u32,

    /// How often to prune published entries.
    pub cleanup_interval: Duration,

    /// Published entries older than this are pruned.
    pub retention_hours: u32,
}

impl Default for OutboxPublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 100,
            cleanup_interval: Duration::from_secs(3600),
            retention_hours: 168,
        }
    }
}

impl From<&OutboxConfig> for OutboxPublisherConfig {
    fn from(config: &OutboxConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            batch_size: config.batch_size,
            retention_hours: config.retention_hours,
            ..Self::default()
        }
    }
}

impl OutboxPublisherConfig {
    /// Create config with custom poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create config with custom batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

/// Background service that publishes events from the outbox.
pub struct OutboxPublisher {
    outbox: Arc<dyn OutboxStore>,
    event_publisher: Arc<dyn EventPublisher>,
    config: OutboxPublisherConfig,
}

impl OutboxPublisher {
    /// Create a new OutboxPublisher with default configuration.
    pub fn new(outbox: Arc<dyn OutboxStore>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_config(outbox, event_publisher, OutboxPublisherConfig::default())
    }

    /// Create a new OutboxPublisher with custom configuration.
    pub fn with_config(
        outbox: Arc<dyn OutboxStore>,
        event_publisher: Arc<dyn EventPublisher>,
        config: OutboxPublisherConfig,
    ) -> Self {
        Self {
            outbox,
            event_publisher,
            config,
        }
    }

    /// Run the relay loop until a shutdown signal is received.
    ///
    /// Batch failures are logged and retried on the next tick; they never
    /// stop the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut poll = time::interval(self.config.poll_interval);
        let mut cleanup = time::interval(self.config.cleanup_interval);
        poll.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "outbox relay started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.relay_logged().await;
                        tracing::info!("outbox relay stopped");
                        return;
                    }
                }

                _ = poll.tick() => {
                    self.relay_logged().await;
                }

                _ = cleanup.tick() => {
                    match self.outbox.cleanup_old(self.config.retention_hours).await {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "pruned published outbox entries"),
                        Err(e) => tracing::warn!(error = %e, "outbox cleanup failed"),
                    }
                }
            }
        }
    }

    async fn relay_logged(&self) {
        if let Err(e) = self.process_batch().await {
            tracing::error!(error = %e, "outbox relay batch failed");
        }
    }

    /// Process a single batch of undelivered events.
    ///
    /// Returns the number of events published.
    pub async fn process_batch(&self) -> Result<usize, DomainError> {
        let entries = self.outbox.get_pending(self.config.batch_size).await?;
        let mut blocked: HashSet<String> = HashSet::new();
        let mut published_count = 0;

        for entry in entries {
            if blocked.contains(&entry.partition_key) {
                continue;
            }

            match self.event_publisher.publish(entry.event.clone()).await {
                Ok(()) => {
                    self.outbox.mark_published(entry.id).await?;
                    published_count += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        event_id = %entry.event.event_id,
                        partition_key = %entry.partition_key,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "failed to publish event, will retry"
                    );
                    self.outbox.mark_failed(entry.id, &e.to_string()).await?;
                    blocked.insert(entry.partition_key);
                }
            }
        }

        Ok(published_count)
    }

    /// Run exactly one poll cycle.
    pub async fn poll_once(&self) -> Result<usize, DomainError> {
        self.process_batch().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventBus;
    use crate::domain::foundation::{ErrorCode, EventEnvelope};
    use crate::ports::{OutboxEntry, OutboxStatus};
    use serde_json::json;
    use tokio::sync::RwLock;
    use uuid::Uuid;

    /// Outbox keeping entries in write order, selecting by status.
    struct TestOutboxStore {
        entries: RwLock<Vec<OutboxEntry>>,
    }

    impl TestOutboxStore {
        fn new() -> Self {
            Self {
                entries: RwLock::new(Vec::new()),
            }
        }

        async fn add_pending(&self, event: EventEnvelope) {
            self.entries.write().await.push(OutboxEntry::for_event(event));
        }

        async fn count(&self, status: OutboxStatus) -> usize {
            self.entries
                .read()
                .await
                .iter()
                .filter(|e| e.status == status)
                .count()
        }
    }

    #[async_trait::async_trait]
    impl OutboxStore for TestOutboxStore {
        async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
            Ok(self
                .entries
                .read()
                .await
                .iter()
                .filter(|e| e.status != OutboxStatus::Published)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn mark_published(&self, id: Uuid) -> Result<(), DomainError> {
            if let Some(entry) = self.entries.write().await.iter_mut().find(|e| e.id == id) {
                entry.mark_published();
            }
            Ok(())
        }

        async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
            if let Some(entry) = self.entries.write().await.iter_mut().find(|e| e.id == id) {
                entry.mark_failed(error);
            }
            Ok(())
        }

        async fn cleanup_old(&self, _older_than_hours: u32) -> Result<u64, DomainError> {
            Ok(0)
        }
    }

    fn event_for(user: &str, seq: u32) -> EventEnvelope {
        EventEnvelope::new(
            "accreditation.state_changed.v1",
            format!("acc-{}", seq),
            "Accreditation",
            json!({ "seq": seq }),
        )
        .with_user_id(user)
    }

    #[tokio::test]
    async fn poll_once_publishes_pending_events() {
        let outbox = Arc::new(TestOutboxStore::new());
        let event_bus = Arc::new(InMemoryEventBus::new());

        outbox.add_pending(event_for("U1", 1)).await;
        outbox.add_pending(event_for("U2", 2)).await;

        let publisher = OutboxPublisher::new(outbox.clone(), event_bus.clone());
        let count = publisher.poll_once().await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(event_bus.event_count(), 2);
        assert_eq!(outbox.count(OutboxStatus::Published).await, 2);
    }

    #[tokio::test]
    async fn poll_once_respects_batch_size() {
        let outbox = Arc::new(TestOutboxStore::new());
        let event_bus = Arc::new(InMemoryEventBus::new());

        for i in 0..5 {
            outbox.add_pending(event_for("U1", i)).await;
        }

        let config = OutboxPublisherConfig::default().with_batch_size(2);
        let publisher = OutboxPublisher::with_config(outbox.clone(), event_bus.clone(), config);

        assert_eq!(publisher.poll_once().await.unwrap(), 2);
        assert_eq!(publisher.poll_once().await.unwrap(), 2);
        assert_eq!(publisher.poll_once().await.unwrap(), 1);
        assert_eq!(publisher.poll_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failure_holds_back_later_events_of_same_partition_only() {
        let outbox = Arc::new(TestOutboxStore::new());
        let event_bus = Arc::new(InMemoryEventBus::new());

        outbox.add_pending(event_for("U1", 1)).await;
        outbox.add_pending(event_for("U2", 2)).await;
        outbox.add_pending(event_for("U1", 3)).await;

        event_bus.set_unavailable("U1", true);
        let publisher = OutboxPublisher::new(outbox.clone(), event_bus.clone());

        assert_eq!(publisher.poll_once().await.unwrap(), 1);
        assert_eq!(outbox.count(OutboxStatus::Failed).await, 1);
        assert_eq!(outbox.count(OutboxStatus::Pending).await, 1);
        assert!(event_bus.events_for_partition("U1").is_empty());

        event_bus.set_unavailable("U1", false);
        assert_eq!(publisher.poll_once().await.unwrap(), 2);

        let delivered: Vec<_> = event_bus
            .events_for_partition("U1")
            .into_iter()
            .map(|e| e.aggregate_id)
            .collect();
        assert_eq!(delivered, vec!["acc-1", "acc-3"]);
    }

    /// Event publisher that always fails
    struct FailingPublisher;

    #[async_trait::async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::MessageBrokerError, "Publish failed"))
        }
    }

    #[tokio::test]
    async fn failed_publish_marks_event_as_failed() {
        let outbox = Arc::new(TestOutboxStore::new());
        outbox.add_pending(event_for("U1", 1)).await;

        let publisher = OutboxPublisher::new(outbox.clone(), Arc::new(FailingPublisher));
        let count = publisher.poll_once().await.unwrap();

        assert_eq!(count, 0);
        assert_eq!(outbox.count(OutboxStatus::Failed).await, 1);
        assert_eq!(outbox.count(OutboxStatus::Published).await, 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let outbox = Arc::new(TestOutboxStore::new());
        let event_bus = Arc::new(InMemoryEventBus::new());

        outbox.add_pending(event_for("U1", 1)).await;

        let config =
            OutboxPublisherConfig::default().with_poll_interval(Duration::from_millis(10));
        let publisher = OutboxPublisher::with_config(outbox.clone(), event_bus.clone(), config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { publisher.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(event_bus.event_count(), 1);
    }

    #[test]
    fn config_follows_outbox_settings() {
        let settings = OutboxConfig {
            poll_interval_ms: 250,
            batch_size: 10,
            retention_hours: 24,
        };
        let config = OutboxPublisherConfig::from(&settings);

        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.retention_hours, 24);
    }
}
