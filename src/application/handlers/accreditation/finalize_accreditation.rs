//! FinalizeAccreditationHandler - administrative decision on an accreditation.

use std::sync::Arc;

use crate::domain::accreditation::{
    AccreditationError, AccreditationStateChange, AccreditationStatus, FinalStatus,
    FinalizeDecision, StateChangeAction,
};
use crate::domain::foundation::{AccreditationId, CommandMetadata};
use crate::ports::{AccreditationRepository, AccreditationTransaction};

use super::transition::{apply_transition, finish, infrastructure};

/// Command to move an accreditation to a final status.
#[derive(Debug, Clone)]
pub struct FinalizeAccreditationCommand {
    pub accreditation_id: AccreditationId,
    pub outcome: FinalStatus,
}

/// Result of a finalize on an existing accreditation.
#[derive(Debug, Clone)]
pub struct FinalizeAccreditationResult {
    pub accreditation_id: AccreditationId,
    pub status: AccreditationStatus,
    /// `None` when the request was an idempotent retry.
    pub event: Option<AccreditationStateChange>,
}

/// Handler for finalizing accreditations.
pub struct FinalizeAccreditationHandler {
    repository: Arc<dyn AccreditationRepository>,
}

impl FinalizeAccreditationHandler {
    pub fn new(repository: Arc<dyn AccreditationRepository>) -> Self {
        Self { repository }
    }

    /// Applies the requested outcome.
    ///
    /// Returns `Ok(None)` when no accreditation has this id.
    ///
    /// # Errors
    ///
    /// - `AlreadyFailed` if the record is FAILED and a different outcome was requested
    /// - `ConcurrentUpdate` if another writer changed the record after it was read
    /// - `Internal` on storage or outbox failure
    pub async fn handle(
        &self,
        cmd: FinalizeAccreditationCommand,
        metadata: CommandMetadata,
    ) -> Result<Option<FinalizeAccreditationResult>, AccreditationError> {
        let mut tx = self
            .repository
            .begin()
            .await
            .map_err(infrastructure("begin finalize"))?;
        let result = finalize_in(tx.as_mut(), &cmd, &metadata).await;
        finish(tx, result).await
    }
}

async fn finalize_in(
    tx: &mut dyn AccreditationTransaction,
    cmd: &FinalizeAccreditationCommand,
    metadata: &CommandMetadata,
) -> Result<Option<FinalizeAccreditationResult>, AccreditationError> {
    let Some(accreditation) = tx
        .find_by_id(&cmd.accreditation_id)
        .await
        .map_err(infrastructure("load accreditation"))?
    else {
        tracing::info!(accreditation_id = %cmd.accreditation_id, "finalize of unknown accreditation");
        return Ok(None);
    };

    let decision = accreditation.plan_finalize(cmd.outcome).map_err(|err| {
        tracing::warn!(
            accreditation_id = %accreditation.id,
            requested = %cmd.outcome,
            "accreditation is already FAILED"
        );
        err
    })?;

    match decision {
        FinalizeDecision::Unchanged => {
            tracing::info!(
                accreditation_id = %accreditation.id,
                status = %accreditation.status,
                "accreditation already in requested status"
            );
            Ok(Some(FinalizeAccreditationResult {
                accreditation_id: accreditation.id,
                status: accreditation.status,
                event: None,
            }))
        }
        FinalizeDecision::Transition { from, to } => {
            let event = apply_transition(
                tx,
                &accreditation,
                from,
                to,
                StateChangeAction::Finalise,
                metadata,
            )
            .await?;

            tracing::info!(
                accreditation_id = %accreditation.id,
                from = %from,
                to = %to,
                "accreditation finalized"
            );
            Ok(Some(FinalizeAccreditationResult {
                accreditation_id: accreditation.id,
                status: to,
                event: Some(event),
            }))
        }
    }
}
