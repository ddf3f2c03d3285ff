//! Redis configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Redis configuration for the state-change streams
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Stream name prefix; partitions are appended as `.<n>`
    #[serde(default = "default_stream_prefix")]
    pub stream_prefix: String,

    /// Number of stream partitions events are spread across
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Upper bound on a single publish, in milliseconds
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_ms: u64,
}

impl RedisConfig {
    /// Get publish timeout as Duration
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    /// Validate Redis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.stream_prefix.trim().is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_STREAM_PREFIX"));
        }
        if self.partitions == 0 {
            return Err(ValidationError::InvalidPartitionCount);
        }
        if self.publish_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            stream_prefix: default_stream_prefix(),
            partitions: default_partitions(),
            publish_timeout_ms: default_publish_timeout(),
        }
    }
}

fn default_stream_prefix() -> String {
    "accreditation-state-changes".to_string()
}

fn default_partitions() -> u32 {
    1
}

fn default_publish_timeout() -> u64 {
    5000
}
