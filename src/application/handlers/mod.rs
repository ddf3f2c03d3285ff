//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod accreditation;

pub use accreditation::{
    CreateAccreditationCommand, CreateAccreditationHandler, CreateAccreditationResult,
    ExpirationReport, ExpireConfirmedCommand, ExpireConfirmedHandler,
    FinalizeAccreditationCommand, FinalizeAccreditationHandler, FinalizeAccreditationResult,
    GetUserAccreditationsHandler, GetUserAccreditationsQuery, UserAccreditations,
};
