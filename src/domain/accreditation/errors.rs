//! Accreditation-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | AlreadyPending | 400 |
//! | AlreadyFailed | 400 |
//! | ConcurrentUpdate | 409 |
//! | NotFound | 404 |
//! | UserNotFound | 404 |
//! | ValidationFailed | 400 |
//! | Internal | 500 |

use thiserror::Error;

use crate::domain::foundation::{AccreditationId, ErrorCode, UserId, ValidationError};

/// Errors surfaced by the accreditation lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccreditationError {
    /// The user already has an outstanding PENDING request.
    #[error("User {0} already has a pending accreditation")]
    AlreadyPending(UserId),

    /// The accreditation is FAILED and a different status was requested.
    #[error("Accreditation {0} is already in FAILED state")]
    AlreadyFailed(AccreditationId),

    /// Another writer changed the record between read and conditional write.
    #[error("Accreditation {0} was modified concurrently, retry the request")]
    ConcurrentUpdate(AccreditationId),

    #[error("Accreditation not found: {0}")]
    NotFound(AccreditationId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Validation failed for {field}: {message}")]
    ValidationFailed { field: String, message: String },

    /// Storage or publish failure. The message is for logs only.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccreditationError {
    pub fn already_pending(user_id: UserId) -> Self {
        AccreditationError::AlreadyPending(user_id)
    }

    pub fn already_failed(id: AccreditationId) -> Self {
        AccreditationError::AlreadyFailed(id)
    }

    pub fn concurrent_update(id: AccreditationId) -> Self {
        AccreditationError::ConcurrentUpdate(id)
    }

    pub fn not_found(id: AccreditationId) -> Self {
        AccreditationError::NotFound(id)
    }

    pub fn user_not_found(user_id: UserId) -> Self {
        AccreditationError::UserNotFound(user_id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AccreditationError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AccreditationError::Internal(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            AccreditationError::AlreadyPending(_) => ErrorCode::AccreditationAlreadyPending,
            AccreditationError::AlreadyFailed(_) => ErrorCode::AccreditationAlreadyFailed,
            AccreditationError::ConcurrentUpdate(_) => ErrorCode::ConcurrentUpdate,
            AccreditationError::NotFound(_) => ErrorCode::AccreditationNotFound,
            AccreditationError::UserNotFound(_) => ErrorCode::UserNotFound,
            AccreditationError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            AccreditationError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// True for errors the caller caused or can resolve by retrying.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AccreditationError::Internal(_))
    }
}

impl From<ValidationError> for AccreditationError {
    fn from(err: ValidationError) -> Self {
        AccreditationError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
