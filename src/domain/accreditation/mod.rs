//! Accreditation domain module.
//!
//! Handles the lifecycle of a user's request to be certified eligible for
//! restricted investment products.
//!
//! # Module Structure
//!
//! - `aggregate` - Accreditation aggregate, its owning User and the finalize plan
//! - `status` - AccreditationStatus state machine and the FinalStatus subset
//! - `accreditation_type` - Income / net worth basis of the request
//! - `document` - Supporting document snapshot
//! - `events` - AccreditationStateChange audit event
//! - `errors` - AccreditationError taxonomy

mod accreditation_type;
mod aggregate;
mod document;
mod errors;
mod events;
mod status;

pub use accreditation_type::AccreditationType;
pub use aggregate::{Accreditation, FinalizeDecision, NewAccreditation, User};
pub use document::Document;
pub use errors::AccreditationError;
pub use events::{AccreditationStateChange, CreateAccreditationRequest, StateChangeAction};
pub use status::{AccreditationStatus, FinalStatus};
