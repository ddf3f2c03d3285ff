//! Scripted repository for handler unit tests.
//!
//! Records every call so tests can assert on the exact number of
//! conditional updates, outbox writes, commits and rollbacks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::accreditation::{
    Accreditation, AccreditationStatus, AccreditationType, Document, NewAccreditation, User,
};
use crate::domain::foundation::{
    AccreditationId, DomainError, ErrorCode, Timestamp, UserId,
};
use crate::ports::{AccreditationRepository, AccreditationTransaction, OutboxEntry};

#[derive(Default)]
pub struct ScriptState {
    pub users: Vec<User>,
    pub records: Vec<Accreditation>,
    pub updates: Vec<(AccreditationId, AccreditationStatus, i64)>,
    pub inserts: usize,
    pub outbox: Vec<OutboxEntry>,
    pub commits: usize,
    pub rollbacks: usize,

    /// Overrides the affected row count of every conditional update.
    pub update_rows: Option<u64>,
    /// Conditional updates against these ids fail with a database error.
    pub failing_updates: Vec<AccreditationId>,
    pub fail_outbox: bool,
    pub fail_find_by_status: bool,
    /// `insert` reports a PENDING unique violation.
    pub insert_conflict: bool,
    /// `insert_user` reports a lost race after storing the user anyway.
    pub lose_user_insert_race: bool,
}

#[derive(Clone, Default)]
pub struct ScriptedRepository {
    pub state: Arc<Mutex<ScriptState>>,
}

impl ScriptedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: Accreditation) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let key = state.users.len() as i64 + 1;
            state.users.push(User {
                key,
                user_id: record.user_id.clone(),
                created_at: record.created_at,
            });
            state.records.push(record);
        }
        self
    }

    pub fn script(&self, f: impl FnOnce(&mut ScriptState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn updates(&self) -> Vec<(AccreditationId, AccreditationStatus, i64)> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn outbox(&self) -> Vec<OutboxEntry> {
        self.state.lock().unwrap().outbox.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }

    pub fn inserts(&self) -> usize {
        self.state.lock().unwrap().inserts
    }

    pub fn status_of(&self, id: &AccreditationId) -> Option<AccreditationStatus> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.status)
    }
}

pub fn record(user: &str, status: AccreditationStatus) -> Accreditation {
    let now = Timestamp::now();
    Accreditation {
        id: AccreditationId::new(),
        user_id: UserId::new(user).unwrap(),
        accreditation_type: AccreditationType::ByIncome,
        document: Document::new("w2.pdf", "application/pdf", "base64").unwrap(),
        status,
        created_at: now,
        updated_at: now,
        version: 1,
    }
}

#[async_trait]
impl AccreditationRepository for ScriptedRepository {
    async fn begin(&self) -> Result<Box<dyn AccreditationTransaction>, DomainError> {
        Ok(Box::new(ScriptedTransaction {
            state: self.state.clone(),
            staged_outbox: Vec::new(),
        }))
    }

    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| &u.user_id == user_id).cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Accreditation>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_status_updated_before(
        &self,
        status: AccreditationStatus,
        cutoff: Timestamp,
    ) -> Result<Vec<Accreditation>, DomainError> {
        let state = self.state.lock().unwrap();
        if state.fail_find_by_status {
            return Err(DomainError::new(ErrorCode::DatabaseError, "query timed out"));
        }
        Ok(state
            .records
            .iter()
            .filter(|r| r.status == status && r.updated_at.is_before(&cutoff))
            .cloned()
            .collect())
    }
}

pub struct ScriptedTransaction {
    state: Arc<Mutex<ScriptState>>,
    staged_outbox: Vec<OutboxEntry>,
}

#[async_trait]
impl AccreditationTransaction for ScriptedTransaction {
    async fn find_user(&mut self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| &u.user_id == user_id).cloned())
    }

    async fn insert_user(&mut self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        let mut state = self.state.lock().unwrap();
        let user = User {
            key: state.users.len() as i64 + 1,
            user_id: user_id.clone(),
            created_at: Timestamp::now(),
        };
        state.users.push(user.clone());
        if state.lose_user_insert_race {
            return Ok(None);
        }
        Ok(Some(user))
    }

    async fn find_by_id(
        &mut self,
        id: &AccreditationId,
    ) -> Result<Option<Accreditation>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state.records.iter().find(|r| &r.id == id).cloned())
    }

    async fn find_pending_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<Accreditation>, DomainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|r| &r.user_id == user_id && r.status == AccreditationStatus::Pending)
            .cloned()
            .collect())
    }

    async fn insert(&mut self, new: &NewAccreditation) -> Result<Accreditation, DomainError> {
        let mut state = self.state.lock().unwrap();
        state.inserts += 1;
        if state.insert_conflict {
            return Err(DomainError::new(ErrorCode::Conflict, "duplicate pending"));
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
        Ok(record)
    }

    async fn conditional_update_status(
        &mut self,
        id: &AccreditationId,
        status: AccreditationStatus,
        expected_version: i64,
    ) -> Result<u64, DomainError> {
        let mut state = self.state.lock().unwrap();
        state.updates.push((*id, status, expected_version));
        if state.failing_updates.contains(id) {
            return Err(DomainError::new(ErrorCode::DatabaseError, "deadlock detected"));
        }
        if let Some(rows) = state.update_rows {
            return Ok(rows);
        }
        match state
            .records
            .iter_mut()
            .find(|r| &r.id == id && r.version == expected_version)
        {
            Some(record) => {
                record.status = status;
                record.version += 1;
                record.updated_at = Timestamp::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn write_outbox(&mut self, entry: &OutboxEntry) -> Result<(), DomainError> {
        if self.state.lock().unwrap().fail_outbox {
            return Err(DomainError::new(ErrorCode::DatabaseError, "outbox unavailable"));
        }
        self.staged_outbox.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let this = *self;
        let mut state = this.state.lock().unwrap();
        state.commits += 1;
        state.outbox.extend(this.staged_outbox);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}
