//! HTTP handlers for accreditation endpoints.
//!
//! These handlers connect Axum routes to the accreditation command and query
//! handlers. Every request runs as one command with metadata sourced from
//! "http" and correlated by the `x-request-id` header.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::{
    CreateAccreditationCommand, CreateAccreditationHandler, FinalizeAccreditationCommand,
    FinalizeAccreditationHandler, GetUserAccreditationsHandler, GetUserAccreditationsQuery,
};
use crate::domain::accreditation::{AccreditationError, FinalStatus};
use crate::domain::foundation::{AccreditationId, CommandMetadata, UserId, ValidationError};
use crate::ports::AccreditationRepository;

use super::dto::{
    AccreditationResponse, AccreditationStatusDetails, AccreditationStatusResponse,
    CreateAccreditationRequest, ErrorResponse, FinalizeAccreditationRequest,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
#[derive(Clone)]
pub struct AccreditationAppState {
    pub repository: Arc<dyn AccreditationRepository>,
}

impl AccreditationAppState {
    pub fn new(repository: Arc<dyn AccreditationRepository>) -> Self {
        Self { repository }
    }

    pub fn create_accreditation_handler(&self) -> CreateAccreditationHandler {
        CreateAccreditationHandler::new(self.repository.clone())
    }

    pub fn finalize_accreditation_handler(&self) -> FinalizeAccreditationHandler {
        FinalizeAccreditationHandler::new(self.repository.clone())
    }

    pub fn get_user_accreditations_handler(&self) -> GetUserAccreditationsHandler {
        GetUserAccreditationsHandler::new(self.repository.clone())
    }
}

fn command_metadata(headers: &HeaderMap) -> CommandMetadata {
    let metadata = CommandMetadata::new("http");
    match headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        Some(id) if !id.is_empty() => metadata.with_correlation_id(id),
        _ => metadata,
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /user/accreditation - Open a new accreditation request
pub async fn create_accreditation(
    State(state): State<AccreditationAppState>,
    headers: HeaderMap,
    Json(request): Json<CreateAccreditationRequest>,
) -> Result<impl IntoResponse, AccreditationApiError> {
    tracing::info!(
        user_id = %request.user_id,
        accreditation_type = %request.accreditation_type,
        document = %request.document.name,
        "received accreditation request"
    );

    let cmd = CreateAccreditationCommand {
        user_id: UserId::new(request.user_id)?,
        accreditation_type: request.accreditation_type,
        document: request.document.into(),
    };

    let result = state
        .create_accreditation_handler()
        .handle(cmd, command_metadata(&headers))
        .await?;

    Ok((
        StatusCode::OK,
        Json(AccreditationResponse {
            accreditation_id: result.accreditation.id.to_string(),
        }),
    ))
}

/// PUT /user/accreditation/:accreditation_id - Record an administrative decision
pub async fn finalize_accreditation(
    State(state): State<AccreditationAppState>,
    Path(accreditation_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<FinalizeAccreditationRequest>,
) -> Result<impl IntoResponse, AccreditationApiError> {
    tracing::info!(
        accreditation_id = %accreditation_id,
        outcome = %request.outcome,
        "received finalize accreditation request"
    );

    let id: AccreditationId = accreditation_id.parse().map_err(|_| {
        ValidationError::invalid_format("accreditation_id", "must be a UUID")
    })?;
    let outcome = FinalStatus::try_from(request.outcome)?;

    let result = state
        .finalize_accreditation_handler()
        .handle(
            FinalizeAccreditationCommand {
                accreditation_id: id,
                outcome,
            },
            command_metadata(&headers),
        )
        .await?
        .ok_or_else(|| AccreditationError::not_found(id))?;

    Ok((
        StatusCode::OK,
        Json(AccreditationResponse {
            accreditation_id: result.accreditation_id.to_string(),
        }),
    ))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /user/:user_id/accreditation - List a user's accreditations
pub async fn get_user_accreditations(
    State(state): State<AccreditationAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AccreditationApiError> {
    tracing::info!(user_id = %user_id, "getting accreditations for user");

    let result = state
        .get_user_accreditations_handler()
        .handle(GetUserAccreditationsQuery {
            user_id: UserId::new(user_id)?,
        })
        .await?;

    let accreditation_statuses = result
        .accreditations
        .iter()
        .map(|a| (a.id.to_string(), AccreditationStatusDetails::from(a)))
        .collect();

    Ok(Json(AccreditationStatusResponse {
        user_id: result.user_id.to_string(),
        accreditation_statuses,
    }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper rendering `AccreditationError` as an HTTP response.
#[derive(Debug)]
pub struct AccreditationApiError(pub AccreditationError);

impl From<AccreditationError> for AccreditationApiError {
    fn from(err: AccreditationError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for AccreditationApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl AccreditationApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            AccreditationError::AlreadyPending(_)
            | AccreditationError::AlreadyFailed(_)
            | AccreditationError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            AccreditationError::ConcurrentUpdate(_) => StatusCode::CONFLICT,
            AccreditationError::NotFound(_) | AccreditationError::UserNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AccreditationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccreditationApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(ErrorResponse::from(&self.0))).into_response()
    }
}
