//! Accreditation service entry point.
//!
//! Wires configuration, PostgreSQL, the Redis stream publisher, the outbox
//! relay, the daily expiry sweep and the HTTP API, then serves until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use accreditation_service::adapters::http::{self, AccreditationAppState};
use accreditation_service::adapters::postgres;
use accreditation_service::adapters::{
    ExpirationScheduler, OutboxPublisher, OutboxPublisherConfig, PostgresAccreditationRepository,
    PostgresOutboxStore, RedisStreamPublisher,
};
use accreditation_service::application::ExpireConfirmedHandler;
use accreditation_service::config::{AppConfig, ServerConfig};
use accreditation_service::ports::{AccreditationRepository, EventPublisher, OutboxStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.server);
    config.validate().context("invalid configuration")?;

    tracing::info!(
        environment = %config.server.environment,
        database = %config.database.redacted_url(),
        expire_confirmed_days = config.accreditation.expire_confirmed_days,
        "starting accreditation service"
    );

    let pool = postgres::connect(&config.database).await?;
    tracing::info!("database connection pool established");
    if config.database.run_migrations {
        postgres::run_migrations(&pool, &config.database).await?;
        tracing::info!("database migrations completed");
    }

    let repository: Arc<dyn AccreditationRepository> =
        Arc::new(PostgresAccreditationRepository::new(pool.clone()));
    let outbox: Arc<dyn OutboxStore> = Arc::new(PostgresOutboxStore::new(pool));
    let publisher: Arc<dyn EventPublisher> =
        Arc::new(RedisStreamPublisher::connect(&config.redis).await?);
    tracing::info!(
        stream_prefix = %config.redis.stream_prefix,
        partitions = config.redis.partitions,
        "connected to redis"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let relay = OutboxPublisher::with_config(
        outbox,
        publisher,
        OutboxPublisherConfig::from(&config.outbox),
    );
    let relay_task = {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { relay.run(shutdown).await })
    };

    let sweep_task = if config.accreditation.sweep_enabled {
        let scheduler = ExpirationScheduler::new(
            Arc::new(ExpireConfirmedHandler::new(repository.clone())),
            &config.accreditation,
        );
        let shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move { scheduler.run(shutdown).await }))
    } else {
        tracing::info!("expiry sweep disabled");
        None
    };

    let app = http::router(
        AccreditationAppState::new(repository),
        config.server.request_timeout(),
    );
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down background tasks");
    let _ = shutdown_tx.send(true);
    if let Err(e) = relay_task.await {
        tracing::error!(error = %e, "outbox relay task panicked");
    }
    if let Some(task) = sweep_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "expiry scheduler task panicked");
        }
    }

    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
