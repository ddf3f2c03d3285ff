//! Event adapters.
//!
//! - `InMemoryEventBus` - In-process capture bus for tests and local runs
//! - `RedisStreamPublisher` - Partitioned Redis Streams transport
//! - `OutboxPublisher` - Background relay from the outbox to a publisher

mod in_memory;
mod outbox_publisher;
mod redis_stream;

pub use in_memory::InMemoryEventBus;
pub use outbox_publisher::{OutboxPublisher, OutboxPublisherConfig};
pub use redis_stream::{partition_for, RedisStreamPublisher};
