//! Accreditation persistence ports.
//!
//! # Design
//!
//! - **Unit of work**: every lifecycle operation runs inside one
//!   `AccreditationTransaction`; the audit event is written to the outbox
//!   through the same transaction, so the status change and its event commit
//!   or roll back together.
//! - **Optimistic concurrency**: there is no read lock. Writers call
//!   `conditional_update_status` with the version they read and inspect the
//!   affected row count.
//! - **Rollback on drop**: a transaction dropped without `commit` is rolled back.

use async_trait::async_trait;

use crate::domain::accreditation::{
    Accreditation, AccreditationStatus, NewAccreditation, User,
};
use crate::domain::foundation::{AccreditationId, DomainError, Timestamp, UserId};

use super::OutboxEntry;

/// Repository port for the accreditation aggregate.
#[async_trait]
pub trait AccreditationRepository: Send + Sync {
    /// Opens a new unit of work.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` if no connection could be acquired
    async fn begin(&self) -> Result<Box<dyn AccreditationTransaction>, DomainError>;

    /// Finds a user by external id.
    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, DomainError>;

    /// Finds all accreditations of a user, ordered by `created_at` ascending.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Accreditation>, DomainError>;

    /// Finds accreditations in `status` whose `updated_at` is strictly before `cutoff`.
    ///
    /// Used by the expiry sweep; results carry the version token to write against.
    async fn find_by_status_updated_before(
        &self,
        status: AccreditationStatus,
        cutoff: Timestamp,
    ) -> Result<Vec<Accreditation>, DomainError>;
}

/// One atomic unit of work against the accreditation store.
#[async_trait]
pub trait AccreditationTransaction: Send {
    /// Finds a user by external id.
    async fn find_user(&mut self, user_id: &UserId) -> Result<Option<User>, DomainError>;

    /// Inserts a user if none exists with this id.
    ///
    /// Returns `None` when a concurrent writer inserted the same id first;
    /// callers re-fetch with `find_user`.
    async fn insert_user(&mut self, user_id: &UserId) -> Result<Option<User>, DomainError>;

    /// Finds an accreditation by id.
    async fn find_by_id(
        &mut self,
        id: &AccreditationId,
    ) -> Result<Option<Accreditation>, DomainError>;

    /// Finds the PENDING accreditations of a user.
    async fn find_pending_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<Accreditation>, DomainError>;

    /// Inserts a PENDING accreditation with version 1.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the user already has a PENDING accreditation
    /// - `DatabaseError` on persistence failure
    async fn insert(&mut self, new: &NewAccreditation) -> Result<Accreditation, DomainError>;

    /// Sets `status` and bumps the version, only if the stored version equals
    /// `expected_version`. Also refreshes `updated_at`.
    ///
    /// Returns the number of rows affected: 0 means another writer got there first.
    async fn conditional_update_status(
        &mut self,
        id: &AccreditationId,
        status: AccreditationStatus,
        expected_version: i64,
    ) -> Result<u64, DomainError>;

    /// Appends an event to the outbox as part of this unit of work.
    async fn write_outbox(&mut self, entry: &OutboxEntry) -> Result<(), DomainError>;

    /// Commits all writes, including outbox entries.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discards all writes.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
