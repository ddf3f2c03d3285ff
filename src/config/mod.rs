//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ACCREDITATION` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use accreditation_service::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod accreditation;
mod database;
mod error;
mod outbox;
mod redis;
mod server;

pub use accreditation::AccreditationConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use outbox::OutboxConfig;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (state-change event streams)
    pub redis: RedisConfig,

    /// Lifecycle rules (expiry window, sweep schedule)
    #[serde(default)]
    pub accreditation: AccreditationConfig,

    /// Outbox relay tuning
    #[serde(default)]
    pub outbox: OutboxConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `ACCREDITATION` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ACCREDITATION__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ACCREDITATION__ACCREDITATION__EXPIRE_CONFIRMED_DAYS=30`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ACCREDITATION")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.accreditation.validate()?;
        self.outbox.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("ACCREDITATION__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("ACCREDITATION__REDIS__URL", "redis://localhost:6379");
    }

    fn clear_env() {
        env::remove_var("ACCREDITATION__DATABASE__URL");
        env::remove_var("ACCREDITATION__REDIS__URL");
        env::remove_var("ACCREDITATION__SERVER__PORT");
        env::remove_var("ACCREDITATION__SERVER__ENVIRONMENT");
        env::remove_var("ACCREDITATION__ACCREDITATION__EXPIRE_CONFIRMED_DAYS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.redis.url, "redis://localhost:6379");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_section_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.accreditation.expire_confirmed_days, 30);
        assert!(config.accreditation.sweep_enabled);
        assert_eq!(config.outbox.batch_size, 100);
        assert_eq!(config.redis.stream_prefix, "accreditation-state-changes");
    }

    #[test]
    fn test_expiry_window_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("ACCREDITATION__ACCREDITATION__EXPIRE_CONFIRMED_DAYS", "45");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(result.unwrap().accreditation.expire_confirmed_days, 45);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("ACCREDITATION__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }

    #[test]
    fn test_missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("ACCREDITATION__REDIS__URL", "redis://localhost:6379");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }
}
