//! Accreditation audit event.
//!
//! One `AccreditationStateChange` is emitted per accepted status change:
//! creation, an administrative finalize, or the scheduled expiry sweep.
//! Idempotent retries emit nothing.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccreditationId, EventId, Timestamp, UserId};

use super::{AccreditationStatus, AccreditationType, Document};

/// What caused the state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateChangeAction {
    Create,
    Finalise,
    ScheduledExpire,
}

/// Snapshot of the request that created the accreditation.
///
/// Finalize and expiry events rebuild it from the stored record so every
/// event is self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccreditationRequest {
    pub user_id: UserId,
    pub accreditation_type: AccreditationType,
    pub document: Document,
}

/// Audit / notification event for one accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccreditationStateChange {
    pub event_id: EventId,
    pub timestamp: Timestamp,
    pub action: StateChangeAction,
    pub user_id: UserId,
    pub accreditation_id: AccreditationId,
    pub status: AccreditationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_status: Option<AccreditationStatus>,
    pub request: CreateAccreditationRequest,
}

crate::domain_event!(
    AccreditationStateChange,
    event_type = "accreditation.state_changed.v1",
    schema_version = 1,
    aggregate_id = accreditation_id,
    aggregate_type = "Accreditation",
    occurred_at = timestamp,
    event_id = event_id
);

impl AccreditationStateChange {
    /// Event for a freshly created PENDING record.
    pub fn created(accreditation_id: AccreditationId, request: CreateAccreditationRequest) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: Timestamp::now(),
            action: StateChangeAction::Create,
            user_id: request.user_id.clone(),
            accreditation_id,
            status: AccreditationStatus::Pending,
            old_status: None,
            request,
        }
    }

    /// Event for a transition `old_status → status`.
    pub fn transitioned(
        action: StateChangeAction,
        accreditation_id: AccreditationId,
        old_status: AccreditationStatus,
        status: AccreditationStatus,
        request: CreateAccreditationRequest,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: Timestamp::now(),
            action,
            user_id: request.user_id.clone(),
            accreditation_id,
            status,
            old_status: Some(old_status),
            request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, SerializableDomainEvent};

    fn request() -> CreateAccreditationRequest {
        CreateAccreditationRequest {
            user_id: UserId::new("U1").unwrap(),
            accreditation_type: AccreditationType::ByIncome,
            document: Document::new("w2.pdf", "application/pdf", "abc").unwrap(),
        }
    }

    #[test]
    fn created_event_has_no_old_status() {
        let id = AccreditationId::new();
        let event = AccreditationStateChange::created(id, request());

        assert_eq!(event.action, StateChangeAction::Create);
        assert_eq!(event.status, AccreditationStatus::Pending);
        assert!(event.old_status.is_none());

        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("old_status").is_none());
        assert_eq!(json["action"], "CREATE");
        assert_eq!(json["request"]["accreditation_type"], "BY_INCOME");
    }

    #[test]
    fn transition_event_carries_both_statuses() {
        let event = AccreditationStateChange::transitioned(
            StateChangeAction::ScheduledExpire,
            AccreditationId::new(),
            AccreditationStatus::Confirmed,
            AccreditationStatus::Expired,
            request(),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "SCHEDULED_EXPIRE");
        assert_eq!(json["old_status"], "CONFIRMED");
        assert_eq!(json["status"], "EXPIRED");
        assert_eq!(json["user_id"], "U1");
    }

    #[test]
    fn envelope_is_keyed_by_accreditation() {
        let id = AccreditationId::new();
        let event = AccreditationStateChange::created(id, request());
        let envelope = event.to_envelope().unwrap();

        assert_eq!(envelope.event_type, "accreditation.state_changed.v1");
        assert_eq!(envelope.aggregate_type, "Accreditation");
        assert_eq!(envelope.aggregate_id, id.to_string());
        assert_eq!(envelope.event_id, event.event_id());

        let restored: AccreditationStateChange = envelope.payload_as().unwrap();
        assert_eq!(restored, event);
    }
}
