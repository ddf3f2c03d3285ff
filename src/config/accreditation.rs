//! Lifecycle configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Upper bound on the expiry window, roughly a century
pub const MAX_EXPIRE_CONFIRMED_DAYS: i64 = 36_500;

/// Expiry window and sweep schedule
#[derive(Debug, Clone, Deserialize)]
pub struct AccreditationConfig {
    /// CONFIRMED records untouched for longer than this are expired
    #[serde(default = "default_expire_confirmed_days")]
    pub expire_confirmed_days: i64,

    /// Hour of day (UTC) the sweep runs
    #[serde(default)]
    pub sweep_hour_utc: u32,

    /// Run the daily sweep in this process
    #[serde(default = "default_sweep_enabled")]
    pub sweep_enabled: bool,
}

impl AccreditationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_EXPIRE_CONFIRMED_DAYS).contains(&self.expire_confirmed_days) {
            return Err(ValidationError::InvalidExpiryWindow);
        }
        if self.sweep_hour_utc > 23 {
            return Err(ValidationError::InvalidSweepHour);
        }
        Ok(())
    }
}

impl Default for AccreditationConfig {
    fn default() -> Self {
        Self {
            expire_confirmed_days: default_expire_confirmed_days(),
            sweep_hour_utc: 0,
            sweep_enabled: default_sweep_enabled(),
        }
    }
}

fn default_expire_confirmed_days() -> i64 {
    30
}

fn default_sweep_enabled() -> bool {
    true
}
