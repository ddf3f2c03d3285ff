//! PostgreSQL implementation of AccreditationRepository.
//!
//! Every lifecycle operation runs in one `sqlx` transaction. The status
//! change and its outbox row commit together; a transaction dropped without
//! commit is rolled back by `sqlx`.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::accreditation::{
    Accreditation, AccreditationStatus, AccreditationType, Document, NewAccreditation, User,
};
use crate::domain::foundation::{AccreditationId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{AccreditationRepository, AccreditationTransaction, OutboxEntry};

use super::{column, corrupt};

const SELECT_ACCREDITATION: &str = r#"
    SELECT a.id, u.user_id, a.accreditation_type, a.document_name,
           a.document_mime_type, a.document_content, a.status,
           a.created_at, a.updated_at, a.version
    FROM accreditations a
    JOIN users u ON u.id = a.user_key
"#;

/// PostgreSQL implementation of AccreditationRepository.
#[derive(Clone)]
pub struct PostgresAccreditationRepository {
    pool: PgPool,
}

impl PostgresAccreditationRepository {
    /// Creates a new PostgresAccreditationRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccreditationRepository for PostgresAccreditationRepository {
    async fn begin(&self) -> Result<Box<dyn AccreditationTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("begin transaction", e))?;
        Ok(Box::new(PostgresAccreditationTransaction { tx }))
    }

    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        fetch_user(&self.pool, user_id).await
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Accreditation>, DomainError> {
        let sql = format!("{} WHERE u.user_id = $1 ORDER BY a.created_at ASC", SELECT_ACCREDITATION);
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("fetch user accreditations", e))?;

        rows.iter().map(row_to_accreditation).collect()
    }

    async fn find_by_status_updated_before(
        &self,
        status: AccreditationStatus,
        cutoff: Timestamp,
    ) -> Result<Vec<Accreditation>, DomainError> {
        let sql = format!(
            "{} WHERE a.status = $1 AND a.updated_at < $2 ORDER BY a.updated_at ASC",
            SELECT_ACCREDITATION
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(cutoff.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("fetch accreditations by status", e))?;

        rows.iter().map(row_to_accreditation).collect()
    }
}

/// One database transaction.
pub struct PostgresAccreditationTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccreditationTransaction for PostgresAccreditationTransaction {
    async fn find_user(&mut self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        fetch_user(&mut *self.tx, user_id).await
    }

    async fn insert_user(&mut self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, created_at
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("insert user", e))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_id(
        &mut self,
        id: &AccreditationId,
    ) -> Result<Option<Accreditation>, DomainError> {
        let sql = format!("{} WHERE a.id = $1", SELECT_ACCREDITATION);
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("fetch accreditation", e))?;

        row.as_ref().map(row_to_accreditation).transpose()
    }

    async fn find_pending_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Vec<Accreditation>, DomainError> {
        let sql = format!(
            "{} WHERE u.user_id = $1 AND a.status = $2",
            SELECT_ACCREDITATION
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(AccreditationStatus::Pending.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| DomainError::database("fetch pending accreditations", e))?;

        rows.iter().map(row_to_accreditation).collect()
    }

    async fn insert(&mut self, new: &NewAccreditation) -> Result<Accreditation, DomainError> {
        let id = AccreditationId::new();
        let result = sqlx::query(
            r#"
            INSERT INTO accreditations (
                id, user_key, accreditation_type, document_name,
                document_mime_type, document_content, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING created_at, updated_at, version
            "#,
        )
        .bind(id.as_uuid())
        .bind(new.user_key)
        .bind(new.accreditation_type.as_str())
        .bind(&new.document.name)
        .bind(&new.document.mime_type)
        .bind(&new.document.content)
        .bind(AccreditationStatus::Pending.as_str())
        .fetch_one(&mut *self.tx)
        .await;

        let row = match result {
            Ok(row) => row,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(DomainError::new(
                    ErrorCode::Conflict,
                    format!("User {} already has a pending accreditation", new.user_id),
                ));
            }
            Err(e) => return Err(DomainError::database("insert accreditation", e)),
        };

        Ok(Accreditation {
            id,
            user_id: new.user_id.clone(),
            accreditation_type: new.accreditation_type,
            document: new.document.clone(),
            status: AccreditationStatus::Pending,
            created_at: Timestamp::from_datetime(column(&row, "created_at")?),
            updated_at: Timestamp::from_datetime(column(&row, "updated_at")?),
            version: column(&row, "version")?,
        })
    }

    async fn conditional_update_status(
        &mut self,
        id: &AccreditationId,
        status: AccreditationStatus,
        expected_version: i64,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accreditations
            SET status = $1, version = version + 1, updated_at = now()
            WHERE id = $2 AND version = $3
            "#,
        )
        .bind(status.as_str())
        .bind(id.as_uuid())
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("update accreditation status", e))?;

        Ok(result.rows_affected())
    }

    async fn write_outbox(&mut self, entry: &OutboxEntry) -> Result<(), DomainError> {
        let payload = serde_json::to_string(&entry.event).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("Failed to encode event {}: {}", entry.event.event_id, e),
            )
        })?;

        sqlx::query(
            r#"
            INSERT INTO event_outbox (
                id, event_id, event_type, partition_key, payload,
                status, attempts, last_error, created_at
            ) VALUES ($1, $2, $3, $4, $5::jsonb, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.event.event_id.as_str())
        .bind(&entry.event.event_type)
        .bind(&entry.partition_key)
        .bind(payload)
        .bind(entry.status.as_str())
        .bind(entry.attempts as i32)
        .bind(entry.last_error.as_deref())
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| DomainError::database("write outbox entry", e))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DomainError::database("commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DomainError::database("roll back transaction", e))
    }
}

async fn fetch_user<'e>(
    executor: impl PgExecutor<'e>,
    user_id: &UserId,
) -> Result<Option<User>, DomainError> {
    let row = sqlx::query("SELECT id, user_id, created_at FROM users WHERE user_id = $1")
        .bind(user_id.as_str())
        .fetch_optional(executor)
        .await
        .map_err(|e| DomainError::database("fetch user", e))?;

    row.as_ref().map(row_to_user).transpose()
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let user_id: String = column(row, "user_id")?;
    Ok(User {
        key: column(row, "id")?,
        user_id: UserId::new(user_id).map_err(|e| corrupt("users.user_id", e))?,
        created_at: Timestamp::from_datetime(column(row, "created_at")?),
    })
}

fn row_to_accreditation(row: &PgRow) -> Result<Accreditation, DomainError> {
    let id: Uuid = column(row, "id")?;
    let user_id: String = column(row, "user_id")?;
    let accreditation_type: String = column(row, "accreditation_type")?;
    let status: String = column(row, "status")?;

    Ok(Accreditation {
        id: AccreditationId::from_uuid(id),
        user_id: UserId::new(user_id).map_err(|e| corrupt("users.user_id", e))?,
        accreditation_type: AccreditationType::from_str(&accreditation_type)
            .map_err(|e| corrupt("accreditations.accreditation_type", e))?,
        document: Document {
            name: column(row, "document_name")?,
            mime_type: column(row, "document_mime_type")?,
            content: column(row, "document_content")?,
        },
        status: AccreditationStatus::from_str(&status)
            .map_err(|e| corrupt("accreditations.status", e))?,
        created_at: Timestamp::from_datetime(column(row, "created_at")?),
        updated_at: Timestamp::from_datetime(column(row, "updated_at")?),
        version: column(row, "version")?,
    })
}
