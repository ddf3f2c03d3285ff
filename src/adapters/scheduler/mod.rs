//! Background jobs.
//!
//! - `ExpirationScheduler` - Daily sweep expiring long-confirmed accreditations

mod expiration_job;

pub use expiration_job::{duration_until_next_run, ExpirationScheduler};
