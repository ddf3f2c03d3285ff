//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers own one unit of work each; query handlers only read.

pub mod handlers;

pub use handlers::{
    CreateAccreditationCommand, CreateAccreditationHandler, CreateAccreditationResult,
    ExpirationReport, ExpireConfirmedCommand, ExpireConfirmedHandler,
    FinalizeAccreditationCommand, FinalizeAccreditationHandler, FinalizeAccreditationResult,
    GetUserAccreditationsHandler, GetUserAccreditationsQuery, UserAccreditations,
};
