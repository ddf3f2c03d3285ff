//! Accreditation aggregate entity.
//!
//! # Design Decisions
//!
//! - **Version token**: `version` is the optimistic concurrency token. The
//!   store increments it on every accepted conditional update; `updated_at`
//!   is kept for the expiry cutoff but never compared for equality.
//! - **Decide, then write**: the aggregate only plans a change
//!   ([`FinalizeDecision`]); the application layer performs the single
//!   conditional write and emits the event.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccreditationId, StateMachine, Timestamp, UserId};

use super::{
    AccreditationError, AccreditationStatus, AccreditationType, CreateAccreditationRequest,
    Document, FinalStatus,
};

/// Owner of accreditation requests, created lazily on first request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Storage surrogate key.
    pub key: i64,

    /// External identifier supplied by callers. Unique.
    pub user_id: UserId,

    pub created_at: Timestamp,
}

/// Accreditation aggregate.
///
/// # Invariants
///
/// - `id`, `user_id`, `accreditation_type` and `document` never change
/// - at most one PENDING accreditation exists per user
/// - FAILED is absorbing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accreditation {
    pub id: AccreditationId,
    pub user_id: UserId,
    pub accreditation_type: AccreditationType,
    pub document: Document,
    pub status: AccreditationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: i64,
}

/// What a finalize request means for a given record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeDecision {
    /// Requested status equals the current one. No write, no event.
    Unchanged,

    /// Write `to` conditioned on the record's version and emit one event.
    Transition {
        from: AccreditationStatus,
        to: AccreditationStatus,
    },
}

impl Accreditation {
    /// Decides how to handle a request to move this record to `requested`.
    ///
    /// The idempotence check runs before the FAILED check, so re-failing a
    /// FAILED record succeeds without effect.
    ///
    /// # Errors
    ///
    /// `AlreadyFailed` if the record is FAILED and a different outcome was requested.
    pub fn plan_finalize(
        &self,
        requested: FinalStatus,
    ) -> Result<FinalizeDecision, AccreditationError> {
        let target = AccreditationStatus::from(requested);

        if self.status == target {
            return Ok(FinalizeDecision::Unchanged);
        }
        if self.status == AccreditationStatus::Failed {
            return Err(AccreditationError::already_failed(self.id));
        }

        let to = self.status.transition_to(target)?;
        Ok(FinalizeDecision::Transition {
            from: self.status,
            to,
        })
    }

    /// Transition applied by the scheduled sweep to a long-confirmed record.
    ///
    /// Skips the idempotent and already-failed checks; the conditional write
    /// still guards against a concurrent finalize. Returns `(from, to)`.
    pub fn plan_expiration(&self) -> (AccreditationStatus, AccreditationStatus) {
        (self.status, AccreditationStatus::Expired)
    }

    /// True if the record is CONFIRMED and untouched since before `cutoff`.
    pub fn is_expirable(&self, cutoff: &Timestamp) -> bool {
        self.status == AccreditationStatus::Confirmed && self.updated_at.is_before(cutoff)
    }

    /// Rebuilds the original create request for event payloads.
    pub fn to_request(&self) -> CreateAccreditationRequest {
        CreateAccreditationRequest {
            user_id: self.user_id.clone(),
            accreditation_type: self.accreditation_type,
            document: self.document.clone(),
        }
    }
}

/// Data needed to insert a new PENDING accreditation.
///
/// Identifier, timestamps and version are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccreditation {
    pub user_key: i64,
    pub user_id: UserId,
    pub accreditation_type: AccreditationType,
    pub document: Document,
}

impl NewAccreditation {
    pub fn new(user: &User, accreditation_type: AccreditationType, document: Document) -> Self {
        Self {
            user_key: user.key,
            user_id: user.user_id.clone(),
            accreditation_type,
            document,
        }
    }
}
