//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresAccreditationRepository` - Accreditations, users and the outbox
//!   write, each lifecycle operation in one database transaction
//! - `PostgresOutboxStore` - Relay side of the outbox

mod accreditation_repository;
mod outbox_store;

pub use accreditation_repository::PostgresAccreditationRepository;
pub use outbox_store::PostgresOutboxStore;

use std::path::PathBuf;

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Opens the connection pool.
///
/// The acquire timeout bounds every call made through the pool.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::database("connect to database", e))
}

/// Applies pending migrations from `config.migrations_path`.
pub async fn run_migrations(pool: &PgPool, config: &DatabaseConfig) -> Result<(), DomainError> {
    let migrator = sqlx::migrate::Migrator::new(PathBuf::from(&config.migrations_path))
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Failed to load migrations: {}", e)))?;
    migrator
        .run(pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Failed to run migrations: {}", e)))
}

/// Reads a column, reporting decode failures as `DatabaseError`.
fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to decode column {}: {}", name, e),
        )
    })
}

/// A stored value that no longer parses into its domain type.
fn corrupt(name: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid stored value in {}: {}", name, e),
    )
    .with_detail("column", name)
}
