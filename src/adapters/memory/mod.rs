//! In-memory adapters.
//!
//! - `InMemoryAccreditationRepository` - Accreditation store and outbox in one
//!   process, for tests and local runs without PostgreSQL

mod accreditation_repository;

pub use accreditation_repository::{InMemoryAccreditationRepository, InMemoryTransaction};
