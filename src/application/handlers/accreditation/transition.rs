//! Shared unit-of-work plumbing for the lifecycle handlers.
//!
//! `apply_transition` is the optimistic write-and-verify step used by both
//! finalize and the expiry sweep: one conditional update against the version
//! that was read, then the audit event into the outbox.

use crate::domain::accreditation::{
    Accreditation, AccreditationError, AccreditationStateChange, AccreditationStatus,
    StateChangeAction,
};
use crate::domain::foundation::{CommandMetadata, DomainError, SerializableDomainEvent};
use crate::ports::{AccreditationTransaction, OutboxEntry};

/// Maps an unexpected infrastructure failure to `Internal`, logging the detail.
pub(super) fn infrastructure(action: &'static str) -> impl Fn(DomainError) -> AccreditationError {
    move |err| {
        tracing::error!(
            action,
            code = %err.code,
            details = ?err.details,
            error = %err.message,
            "accreditation infrastructure failure"
        );
        AccreditationError::internal(format!("failed to {}: {}", action, err))
    }
}

/// Commits on success, rolls back on failure.
pub(super) async fn finish<T>(
    tx: Box<dyn AccreditationTransaction>,
    result: Result<T, AccreditationError>,
) -> Result<T, AccreditationError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(infrastructure("commit unit of work"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed after aborted unit of work");
            }
            Err(err)
        }
    }
}

/// Writes the audit event to the outbox of the current unit of work.
pub(super) async fn write_event(
    tx: &mut dyn AccreditationTransaction,
    event: &AccreditationStateChange,
    metadata: &CommandMetadata,
) -> Result<(), AccreditationError> {
    let mut envelope = event
        .to_envelope()
        .map_err(infrastructure("serialize audit event"))?
        .with_correlation_id(metadata.correlation_id())
        .with_user_id(event.user_id.as_str());
    if let Some(source) = metadata.source() {
        envelope = envelope.with_source(source);
    }

    tx.write_outbox(&OutboxEntry::for_event(envelope))
        .await
        .map_err(infrastructure("write audit event to outbox"))
}

/// Moves `accreditation` from `from` to `to`, guarded by its version token.
///
/// # Errors
///
/// - `ConcurrentUpdate` if the conditional update matched no row
/// - `Internal` if the write or the outbox append fails
pub(super) async fn apply_transition(
    tx: &mut dyn AccreditationTransaction,
    accreditation: &Accreditation,
    from: AccreditationStatus,
    to: AccreditationStatus,
    action: StateChangeAction,
    metadata: &CommandMetadata,
) -> Result<AccreditationStateChange, AccreditationError> {
    let affected = tx
        .conditional_update_status(&accreditation.id, to, accreditation.version)
        .await
        .map_err(infrastructure("update accreditation status"))?;

    match affected {
        0 => {
            tracing::warn!(
                accreditation_id = %accreditation.id,
                expected_version = accreditation.version,
                requested = %to,
                "accreditation changed since it was read, rejecting update"
            );
            return Err(AccreditationError::concurrent_update(accreditation.id));
        }
        1 => {
            tracing::debug!(accreditation_id = %accreditation.id, "conditional update applied");
        }
        n => {
            tracing::warn!(
                accreditation_id = %accreditation.id,
                affected = n,
                "conditional update affected more than one row"
            );
        }
    }

    let event = AccreditationStateChange::transitioned(
        action,
        accreditation.id,
        from,
        to,
        accreditation.to_request(),
    );
    write_event(tx, &event, metadata).await?;

    Ok(event)
}
