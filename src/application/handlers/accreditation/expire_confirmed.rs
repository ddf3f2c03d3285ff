//! ExpireConfirmedHandler - the daily expiry sweep.
//!
//! Selects CONFIRMED accreditations untouched for longer than the retention
//! window and expires each one in its own unit of work. A failure on one
//! record is logged and counted; the sweep carries on with the rest.

use std::sync::Arc;

use crate::domain::accreditation::{
    Accreditation, AccreditationError, AccreditationStatus, StateChangeAction,
};
use crate::domain::foundation::{AccreditationId, CommandMetadata, Timestamp};
use crate::ports::AccreditationRepository;

use super::transition::{apply_transition, finish, infrastructure};

/// Command to run one sweep.
#[derive(Debug, Clone, Copy)]
pub struct ExpireConfirmedCommand {
    /// CONFIRMED records last updated more than this many days ago are expired.
    pub retention_days: i64,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirationReport {
    pub examined: usize,
    pub expired: Vec<AccreditationId>,
    pub failed: Vec<AccreditationId>,
}

/// Handler for the expiry sweep.
pub struct ExpireConfirmedHandler {
    repository: Arc<dyn AccreditationRepository>,
}

impl ExpireConfirmedHandler {
    pub fn new(repository: Arc<dyn AccreditationRepository>) -> Self {
        Self { repository }
    }

    /// Runs one sweep.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if the retention window is not positive or reaches
    /// outside the representable time range. `Internal` only if the candidate
    /// query itself fails. Per-record failures are reported in
    /// [`ExpirationReport::failed`].
    pub async fn handle(
        &self,
        cmd: ExpireConfirmedCommand,
        metadata: CommandMetadata,
    ) -> Result<ExpirationReport, AccreditationError> {
        if cmd.retention_days < 1 {
            return Err(AccreditationError::validation(
                "retention_days",
                "must be at least one day",
            ));
        }
        let cutoff = Timestamp::now()
            .minus_days(cmd.retention_days)
            .map_err(|_| AccreditationError::validation("retention_days", "out of range"))?;
        let candidates = self
            .repository
            .find_by_status_updated_before(AccreditationStatus::Confirmed, cutoff)
            .await
            .map_err(infrastructure("find expirable accreditations"))?;

        let mut report = ExpirationReport {
            examined: candidates.len(),
            ..Default::default()
        };

        for accreditation in &candidates {
            match self.expire_one(accreditation, &metadata).await {
                Ok(()) => report.expired.push(accreditation.id),
                Err(AccreditationError::ConcurrentUpdate(id)) => {
                    tracing::warn!(accreditation_id = %id, "skipping accreditation changed during sweep");
                    report.failed.push(id);
                }
                Err(err) => {
                    tracing::error!(
                        accreditation_id = %accreditation.id,
                        error = %err,
                        "failed to expire accreditation"
                    );
                    report.failed.push(accreditation.id);
                }
            }
        }

        tracing::info!(
            retention_days = cmd.retention_days,
            examined = report.examined,
            expired = report.expired.len(),
            failed = report.failed.len(),
            "expiration sweep finished"
        );
        Ok(report)
    }

    async fn expire_one(
        &self,
        accreditation: &Accreditation,
        metadata: &CommandMetadata,
    ) -> Result<(), AccreditationError> {
        let (from, to) = accreditation.plan_expiration();

        let mut tx = self
            .repository
            .begin()
            .await
            .map_err(infrastructure("begin expiration"))?;
        let result = apply_transition(
            tx.as_mut(),
            accreditation,
            from,
            to,
            StateChangeAction::ScheduledExpire,
            metadata,
        )
        .await;
        finish(tx, result).await?;

        tracing::info!(accreditation_id = %accreditation.id, "accreditation expired by sweep");
        Ok(())
    }
}
