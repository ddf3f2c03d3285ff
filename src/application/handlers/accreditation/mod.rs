//! Accreditation lifecycle handlers.
//!
//! - `CreateAccreditationHandler` - open a PENDING request (emits CREATE)
//! - `FinalizeAccreditationHandler` - administrative decision (emits FINALISE)
//! - `ExpireConfirmedHandler` - daily sweep of stale CONFIRMED records (emits SCHEDULED_EXPIRE)
//! - `GetUserAccreditationsHandler` - list a user's requests
//!
//! Every command runs in exactly one unit of work and writes its audit event
//! to the outbox before committing.

mod create_accreditation;
mod expire_confirmed;
mod finalize_accreditation;
mod get_user_accreditations;
mod transition;

#[cfg(test)]
mod test_support;

pub use create_accreditation::{
    CreateAccreditationCommand, CreateAccreditationHandler, CreateAccreditationResult,
};
pub use expire_confirmed::{ExpirationReport, ExpireConfirmedCommand, ExpireConfirmedHandler};
pub use finalize_accreditation::{
    FinalizeAccreditationCommand, FinalizeAccreditationHandler, FinalizeAccreditationResult,
};
pub use get_user_accreditations::{
    GetUserAccreditationsHandler, GetUserAccreditationsQuery, UserAccreditations,
};
