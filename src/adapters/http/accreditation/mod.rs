//! Accreditation HTTP adapter.
//!
//! Exposes the lifecycle commands and the per-user status query as REST
//! endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    AccreditationResponse, AccreditationStatusDetails, AccreditationStatusResponse,
    CreateAccreditationRequest, DocumentDto, ErrorResponse, FinalizeAccreditationRequest,
};
pub use handlers::{
    create_accreditation, finalize_accreditation, get_user_accreditations, health,
    AccreditationApiError, AccreditationAppState,
};
pub use routes::accreditation_router;
