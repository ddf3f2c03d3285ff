//! HTTP adapters - REST API implementations.
//!
//! - `accreditation` - Lifecycle endpoints under `/user`
//!
//! [`router`] assembles the full application with the health probe and the
//! tower-http layers for request ids, tracing and timeouts.

pub mod accreditation;

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use accreditation::{accreditation_router, AccreditationApiError, AccreditationAppState};

/// Builds the service router.
///
/// Requests without an `x-request-id` header get a generated one, which is
/// echoed on the response and used as the correlation id of emitted events.
pub fn router(state: AccreditationAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(accreditation::health))
        .merge(accreditation_router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
