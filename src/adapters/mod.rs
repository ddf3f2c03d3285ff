//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - Event transport (Redis streams, in-memory) and the outbox relay
//! - `http` - REST API (axum)
//! - `memory` - In-process accreditation store
//! - `postgres` - PostgreSQL accreditation store and outbox
//! - `scheduler` - Daily expiry sweep

pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod scheduler;

pub use events::{
    partition_for, InMemoryEventBus, OutboxPublisher, OutboxPublisherConfig, RedisStreamPublisher,
};
pub use memory::InMemoryAccreditationRepository;
pub use postgres::{PostgresAccreditationRepository, PostgresOutboxStore};
pub use scheduler::ExpirationScheduler;
