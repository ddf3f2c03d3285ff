//! Daily expiry sweep driver.
//!
//! Sleeps until the configured hour (UTC), runs one sweep through
//! `ExpireConfirmedHandler`, and repeats until shutdown. A failed sweep is
//! logged; the next day's run is still scheduled.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::application::{ExpirationReport, ExpireConfirmedCommand, ExpireConfirmedHandler};
use crate::config::AccreditationConfig;
use crate::domain::accreditation::AccreditationError;
use crate::domain::foundation::CommandMetadata;

/// Time from `now` until the next occurrence of `hour_utc:00:00`.
///
/// If `now` is exactly on the hour, the next run is a day later.
pub fn duration_until_next_run(now: DateTime<Utc>, hour_utc: u32) -> Duration {
    let Some(today) = now.date_naive().and_hms_opt(hour_utc % 24, 0, 0) else {
        return Duration::from_secs(24 * 60 * 60);
    };
    let mut next = Utc.from_utc_datetime(&today);
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Runs the expiry sweep once a day.
pub struct ExpirationScheduler {
    handler: Arc<ExpireConfirmedHandler>,
    retention_days: i64,
    hour_utc: u32,
}

impl ExpirationScheduler {
    pub fn new(handler: Arc<ExpireConfirmedHandler>, config: &AccreditationConfig) -> Self {
        Self {
            handler,
            retention_days: config.expire_confirmed_days,
            hour_utc: config.sweep_hour_utc,
        }
    }

    /// Runs one sweep now.
    ///
    /// Every event emitted by the sweep carries the same correlation id.
    pub async fn run_once(&self) -> Result<ExpirationReport, AccreditationError> {
        let correlation_id = Uuid::new_v4().to_string();
        tracing::info!(
            retention_days = self.retention_days,
            correlation_id = %correlation_id,
            "running scheduled expiry of old confirmed accreditations"
        );
        self.handler
            .handle(
                ExpireConfirmedCommand {
                    retention_days: self.retention_days,
                },
                CommandMetadata::new("scheduler").with_correlation_id(correlation_id),
            )
            .await
    }

    /// Loops until the shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let wait = duration_until_next_run(Utc::now(), self.hour_utc);
            tracing::debug!(wait_secs = wait.as_secs(), "next expiry sweep scheduled");

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("expiry scheduler stopped");
                        return;
                    }
                }

                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!(error = %e, "scheduled expiry sweep failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryAccreditationRepository;
    use crate::application::{
        CreateAccreditationCommand, CreateAccreditationHandler, FinalizeAccreditationCommand,
        FinalizeAccreditationHandler,
    };
    use crate::domain::accreditation::{
        AccreditationStateChange, AccreditationType, Document, FinalStatus, StateChangeAction,
    };
    use crate::domain::foundation::{AccreditationId, UserId};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn waits_until_later_today() {
        assert_eq!(
            duration_until_next_run(at(22, 30, 0), 23),
            Duration::from_secs(30 * 60)
        );
    }

    #[test]
    fn rolls_over_to_tomorrow_after_the_hour() {
        assert_eq!(
            duration_until_next_run(at(0, 0, 1), 0),
            Duration::from_secs(24 * 60 * 60 - 1)
        );
    }

    #[test]
    fn exactly_on_the_hour_waits_a_full_day() {
        assert_eq!(
            duration_until_next_run(at(0, 0, 0), 0),
            Duration::from_secs(24 * 60 * 60)
        );
    }

    #[test]
    fn crosses_month_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 23, 0, 0).unwrap();
        assert_eq!(
            duration_until_next_run(now, 0),
            Duration::from_secs(60 * 60)
        );
    }

    async fn confirmed(repo: &InMemoryAccreditationRepository, user: &str) -> AccreditationId {
        let shared = Arc::new(repo.clone());
        let created = CreateAccreditationHandler::new(shared.clone())
            .handle(
                CreateAccreditationCommand {
                    user_id: UserId::new(user).unwrap(),
                    accreditation_type: AccreditationType::ByNetWorth,
                    document: Document::new("statement.pdf", "application/pdf", "").unwrap(),
                },
                CommandMetadata::new("test"),
            )
            .await
            .unwrap();
        let id = created.accreditation.id;
        FinalizeAccreditationHandler::new(shared)
            .handle(
                FinalizeAccreditationCommand {
                    accreditation_id: id,
                    outcome: FinalStatus::Confirmed,
                },
                CommandMetadata::new("test"),
            )
            .await
            .unwrap();
        repo.backdate(&id, 40);
        id
    }

    #[tokio::test]
    async fn one_sweep_shares_a_single_correlation_id() {
        let repo = InMemoryAccreditationRepository::new();
        confirmed(&repo, "U1").await;
        confirmed(&repo, "U2").await;
        let scheduler = ExpirationScheduler::new(
            Arc::new(ExpireConfirmedHandler::new(Arc::new(repo.clone()))),
            &AccreditationConfig::default(),
        );

        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.expired.len(), 2);

        let sweep_correlations: Vec<_> = repo
            .outbox_entries()
            .into_iter()
            .filter(|entry| {
                let change: AccreditationStateChange = entry.event.payload_as().unwrap();
                change.action == StateChangeAction::ScheduledExpire
            })
            .map(|entry| entry.event.metadata.correlation_id)
            .collect();
        assert_eq!(sweep_correlations.len(), 2);
        assert!(sweep_correlations[0].is_some());
        assert_eq!(sweep_correlations[0], sweep_correlations[1]);
    }

    #[tokio::test]
    async fn separate_sweeps_use_distinct_correlation_ids() {
        let repo = InMemoryAccreditationRepository::new();
        let first = confirmed(&repo, "U1").await;
        let scheduler = ExpirationScheduler::new(
            Arc::new(ExpireConfirmedHandler::new(Arc::new(repo.clone()))),
            &AccreditationConfig::default(),
        );
        scheduler.run_once().await.unwrap();
        confirmed(&repo, "U2").await;
        scheduler.run_once().await.unwrap();

        let mut by_sweep = repo.outbox_entries().into_iter().filter_map(|entry| {
            let change: AccreditationStateChange = entry.event.payload_as().unwrap();
            (change.action == StateChangeAction::ScheduledExpire)
                .then(|| (change.accreditation_id, entry.event.metadata.correlation_id))
        });
        let (first_id, first_correlation) = by_sweep.next().unwrap();
        let (_, second_correlation) = by_sweep.next().unwrap();
        assert_eq!(first_id, first);
        assert_ne!(first_correlation, second_correlation);
    }
}
