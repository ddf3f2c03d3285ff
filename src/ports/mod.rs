//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `AccreditationRepository` - Read queries and the entry point to a unit of work
//! - `AccreditationTransaction` - One atomic unit of work: reads, conditional
//!   writes and the outbox write that announces them
//!
//! ## Event Ports
//!
//! - `OutboxStore` - Relay side of the transactional outbox
//! - `EventPublisher` - Broker transport used by the relay

mod accreditation_repository;
mod event_publisher;
mod outbox;

pub use accreditation_repository::{AccreditationRepository, AccreditationTransaction};
pub use event_publisher::EventPublisher;
pub use outbox::{OutboxEntry, OutboxStatus, OutboxStore};
