//! Route configuration for accreditation endpoints.

use axum::routing::{get, post, put};
use axum::Router;

use super::handlers::{
    create_accreditation, finalize_accreditation, get_user_accreditations,
    AccreditationAppState,
};

/// Creates the accreditation router.
///
/// Routes:
/// - `POST /user/accreditation` - Open a PENDING accreditation request
/// - `PUT /user/accreditation/:accreditation_id` - Finalize an accreditation
/// - `GET /user/:user_id/accreditation` - List a user's accreditation statuses
pub fn accreditation_router() -> Router<AccreditationAppState> {
    Router::new()
        .route("/user/accreditation", post(create_accreditation))
        .route(
            "/user/accreditation/:accreditation_id",
            put(finalize_accreditation),
        )
        .route("/user/:user_id/accreditation", get(get_user_accreditations))
}
