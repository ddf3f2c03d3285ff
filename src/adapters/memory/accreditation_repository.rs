//! In-memory implementation of AccreditationRepository and OutboxStore.
//!
//! Writes are applied to the shared store immediately and recorded in an
//! undo log; rollback (explicit or on drop) replays the log backwards.
//! Outbox entries are staged per transaction and only become visible to the
//! relay on commit. The PENDING uniqueness rule is enforced on insert, the
//! same way the database's partial unique index enforces it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::accreditation::{Accreditation, AccreditationStatus, NewAccreditation, User};
use crate::domain::foundation::{AccreditationId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{
    AccreditationRepository, AccreditationTransaction, OutboxEntry, OutboxStatus, OutboxStore,
};

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    records: Vec<Accreditation>,
    outbox: Vec<OutboxEntry>,
    fail_outbox_writes: bool,
    failing_updates: HashSet<AccreditationId>,
}

impl MemoryState {
    fn user(&self, user_id: &UserId) -> Option<User> {
        self.users.iter().find(|u| &u.user_id == user_id).cloned()
    }

    fn record(&self, id: &AccreditationId) -> Option<&Accreditation> {
        self.records.iter().find(|r| &r.id == id)
    }

    fn pending_for(&self, user_id: &UserId) -> Vec<Accreditation> {
        self.records
            .iter()
            .filter(|r| &r.user_id == user_id && r.status == AccreditationStatus::Pending)
            .cloned()
            .collect()
    }
}

enum Undo {
    RemoveUser(i64),
    RemoveRecord(AccreditationId),
    RestoreRecord(Accreditation),
}

fn poisoned() -> DomainError {
    DomainError::new(ErrorCode::InternalError, "in-memory store lock poisoned")
}

/// In-memory accreditation store for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryAccreditationRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryAccreditationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
        self.state.lock().map_err(|_| poisoned())
    }

    fn inspect<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    // === Test Helpers ===

    /// Returns the stored accreditation.
    pub fn get(&self, id: &AccreditationId) -> Option<Accreditation> {
        self.inspect(|s| s.record(id).cloned())
    }

    /// Returns every committed outbox entry in write order.
    pub fn outbox_entries(&self) -> Vec<OutboxEntry> {
        self.inspect(|s| s.outbox.clone())
    }

    /// Number of stored accreditations.
    pub fn accreditation_count(&self) -> usize {
        self.inspect(|s| s.records.len())
    }

    /// Sets `updated_at` to `days` days ago.
    pub fn backdate(&self, id: &AccreditationId, days: i64) {
        self.inspect(|s| {
            let Ok(updated_at) = Timestamp::now().minus_days(days) else {
                return;
            };
            if let Some(record) = s.records.iter_mut().find(|r| &r.id == id) {
                record.updated_at = updated_at;
            }
        });
    }

    /// Makes every outbox write fail until switched off.
    pub fn fail_outbox_writes(&self, fail: bool) {
        self.inspect(|s| s.fail_outbox_writes = fail);
    }

    /// Makes conditional updates of `id` fail with a database error.
    pub fn fail_updates_for(&self, id: AccreditationId) {
        self.inspect(|s| {
            s.failing_updates.insert(id);
        });
    }
}

#[async_trait]
impl AccreditationRepository for InMemoryAccreditationRepository {
    async fn begin(&self) -> Result<Box<dyn AccreditationTransaction>, DomainError> {
        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            undo: Vec::new(),
            staged_outbox: Vec::new(),
            finished: false,
        }))
    }

    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.lock()?.user(user_id))
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Accreditation>, DomainError> {
        let mut records: Vec<Accreditation> = self
            .lock()?
            .records
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn find_by_status_updated_before(
        &self,
        status: AccreditationStatus,
        cutoff: Timestamp,
    ) -> Result<Vec<Accreditation>, DomainError> {
        Ok(self
            .lock()?
            .records
            .iter()
            .filter(|r| r.status == status && r.updated_at.is_before(&cutoff))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OutboxStore for InMemoryAccreditationRepository {
    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
        Ok(self
            .lock()?
            .outbox
            .iter()
            .filter(|e| e.status != OutboxStatus::Published)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError> {
        if let Some(entry) = self.lock()?.outbox.iter_mut().find(|e| e.id == id) {
            entry.mark_published();
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        if let Some(entry) = self.lock()?.outbox.iter_mut().find(|e| e.id == id) {
            entry.mark_failed(error);
        }
        Ok(())
    }

    async fn cleanup_old(&self, older_than_hours: u32) -> Result<u64, DomainError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(older_than_hours));
        let mut state = self.lock()?;
        let before = state.outbox.len();
        state.outbox.retain(|e| {
            !(e.status == OutboxStatus::Published
                && e.processed_at.map_or(false, |at| at < cutoff))
        });
        Ok((before - state.outbox.len()) as u64)
    }
}

/// One unit of work against the in-memory store.
pub struct InMemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    undo: Vec<Undo>,
    staged_outbox: Vec<OutboxEntry>,
    finished: bool,
}

impl InMemoryTransaction {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
        self.state.lock().map_err(|_| poisoned())
    }

    fn undo_all(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::RemoveUser(key) => state.users.retain(|u| u.key != key),
                Undo::RemoveRecord(id) => state.records.retain(|r| r.id != id),
                Undo::RestoreRecord(previous) => {
                    if let Some(record) = state.records.iter_mut().find(|r| r.id == previous.id) {
                        *record = previous;
                    }
                }
            }
        }
        self.staged_outbox.clear();
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.undo_all();
        }
    }
}

#[async_trait]
impl AccreditationTransaction for InMemoryTransaction {
    async fn find_user(&mut self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.lock()?.user(user_id))
    }

    async fn insert_user(&mut self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        let user = {
            let mut state = self.lock()?;
            if state.user(user_id).is_some() {
                return Ok(None);
            }
            let key = state.users.iter().map(|u| u.key).max().unwrap_or(0) + 1;
            let user = User {
                key,
                user_id: user_id.clone(),
                created_at: Timestamp::now(),
            };
            state.users.push(user.clone());
            user
        };
        self.undo.push(Undo::RemoveUser(user.key));
        Ok(Some(user))
    }

    async fn find_by_id(
        &mut self,
        id: &AccreditationId,
    ) -> Result<Option<Accreditation>, DomainError> {
        Ok(self.lock()?.record(id).cloned())
    }

    async fn find_pending_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<Accreditation>, DomainError> {
        Ok(self.lock()?.pending_for(user_id))
    }

    async fn insert(&mut self, new: &NewAccreditation) -> Result<Accreditation, DomainError> {
        let record = {
            let mut state = self.lock()?;
            if !state.pending_for(&new.user_id).is_empty() {
                return Err(DomainError::new(
                    ErrorCode::Conflict,
                    format!("User {} already has a pending accreditation", new.user_id),
                ));
            }
            let now = Timestamp::now();
            let record = Accreditation {
                id: AccreditationId::new(),
                user_id: new.user_id.clone(),
                accreditation_type: new.accreditation_type,
                document: new.document.clone(),
                status: AccreditationStatus::Pending,
                created_at: now,
                updated_at: now,
                version: 1,
            };
            state.records.push(record.clone());
            record
        };
        self.undo.push(Undo::RemoveRecord(record.id));
        Ok(record)
    }

    async fn conditional_update_status(
        &mut self,
        id: &AccreditationId,
        status: AccreditationStatus,
        expected_version: i64,
    ) -> Result<u64, DomainError> {
        // Lets concurrently running units of work interleave between read and write.
        tokio::task::yield_now().await;

        let previous = {
            let mut state = self.lock()?;
            if state.failing_updates.contains(id) {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to update accreditation {}", id),
                ));
            }
            let Some(record) = state
                .records
                .iter_mut()
                .find(|r| &r.id == id && r.version == expected_version)
            else {
                return Ok(0);
            };
            let previous = record.clone();
            record.status = status;
            record.version += 1;
            record.updated_at = Timestamp::now();
            previous
        };
        self.undo.push(Undo::RestoreRecord(previous));
        Ok(1)
    }

    async fn write_outbox(&mut self, entry: &OutboxEntry) -> Result<(), DomainError> {
        if self.lock()?.fail_outbox_writes {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Failed to write outbox entry: outbox unavailable",
            ));
        }
        self.staged_outbox.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut this = *self;
        let staged = std::mem::take(&mut this.staged_outbox);
        this.lock()?.outbox.extend(staged);
        this.undo.clear();
        this.finished = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        let mut this = *self;
        this.undo_all();
        this.finished = true;
        Ok(())
    }
}
