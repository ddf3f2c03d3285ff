//! PostgreSQL implementation of OutboxStore.
//!
//! Rows are written by `PostgresAccreditationTransaction::write_outbox`; this
//! store only serves the relay. Order is the insertion sequence `seq`.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{OutboxEntry, OutboxStatus, OutboxStore};

use super::{column, corrupt};

/// PostgreSQL implementation of OutboxStore.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    /// Creates a new PostgresOutboxStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxEntry>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, payload::text AS payload, status, attempts, last_error,
                   partition_key, created_at, processed_at
            FROM event_outbox
            WHERE status IN ('pending', 'failed')
            ORDER BY seq ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("fetch pending outbox entries", e))?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE event_outbox
            SET status = 'published', attempts = attempts + 1,
                processed_at = now(), last_error = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("mark outbox entry published", e))?;

        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE event_outbox
            SET status = 'failed', attempts = attempts + 1,
                processed_at = now(), last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("mark outbox entry failed", e))?;

        Ok(())
    }

    async fn cleanup_old(&self, older_than_hours: u32) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM event_outbox
            WHERE status = 'published'
              AND processed_at < now() - make_interval(hours => $1)
            "#,
        )
        .bind(older_than_hours as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("clean up outbox", e))?;

        Ok(result.rows_affected())
    }
}

fn row_to_entry(row: &PgRow) -> Result<OutboxEntry, DomainError> {
    let payload: String = column(row, "payload")?;
    let event: EventEnvelope = serde_json::from_str(&payload).map_err(|e| {
        DomainError::new(
            ErrorCode::SerializationError,
            format!("Failed to decode outbox payload: {}", e),
        )
    })?;
    let status: String = column(row, "status")?;
    let attempts: i32 = column(row, "attempts")?;

    Ok(OutboxEntry {
        id: column(row, "id")?,
        event,
        status: OutboxStatus::from_str(&status).map_err(|e| corrupt("event_outbox.status", e))?,
        created_at: column(row, "created_at")?,
        processed_at: column(row, "processed_at")?,
        attempts: attempts.max(0) as u32,
        last_error: column(row, "last_error")?,
        partition_key: column(row, "partition_key")?,
    })
}
