//! Outbox relay configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Polling and retention for the outbox relay
#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum entries relayed per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Published entries older than this are removed
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
}

impl OutboxConfig {
    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidOutboxSetting("poll_interval_ms"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidOutboxSetting("batch_size"));
        }
        if self.retention_hours == 0 {
            return Err(ValidationError::InvalidOutboxSetting("retention_hours"));
        }
        Ok(())
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            batch_size: default_batch_size(),
            retention_hours: default_retention_hours(),
        }
    }
}

fn default_poll_interval() -> u64 {
    100
}

fn default_batch_size() -> u32 {
    100
}

fn default_retention_hours() -> u32 {
    168
}
