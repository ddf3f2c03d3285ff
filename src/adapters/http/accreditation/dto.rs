//! Request and response DTOs for accreditation endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::accreditation::{
    Accreditation, AccreditationError, AccreditationStatus, AccreditationType, Document,
};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /user/accreditation`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccreditationRequest {
    pub user_id: String,
    pub accreditation_type: AccreditationType,
    pub document: DocumentDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDto {
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

impl From<DocumentDto> for Document {
    fn from(dto: DocumentDto) -> Self {
        Document {
            name: dto.name,
            mime_type: dto.mime_type,
            content: dto.content,
        }
    }
}

/// Body of `PUT /user/accreditation/:accreditation_id`.
///
/// `outcome` accepts any status so that PENDING is reported as a
/// validation failure rather than a deserialization error.
#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeAccreditationRequest {
    pub outcome: AccreditationStatus,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccreditationResponse {
    pub accreditation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccreditationStatusDetails {
    pub accreditation_type: AccreditationType,
    pub status: AccreditationStatus,
}

impl From<&Accreditation> for AccreditationStatusDetails {
    fn from(accreditation: &Accreditation) -> Self {
        Self {
            accreditation_type: accreditation.accreditation_type,
            status: accreditation.status,
        }
    }
}

/// Body of `GET /user/:user_id/accreditation`, keyed by accreditation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccreditationStatusResponse {
    pub user_id: String,
    pub accreditation_statuses: BTreeMap<String, AccreditationStatusDetails>,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Message returned in place of any internal failure detail.
    pub const GENERIC_INTERNAL_MESSAGE: &'static str =
        "Unable to perform the requested operation. Please refer to the logs for more details.";

    pub fn internal() -> Self {
        Self {
            error_code: "INTERNAL_ERROR".to_string(),
            message: Self::GENERIC_INTERNAL_MESSAGE.to_string(),
            details: None,
        }
    }
}

impl From<&AccreditationError> for ErrorResponse {
    fn from(err: &AccreditationError) -> Self {
        if let AccreditationError::Internal(_) = err {
            return Self::internal();
        }

        let details = match err {
            AccreditationError::ValidationFailed { field, .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        };

        Self {
            error_code: err.code().to_string(),
            message: err.to_string(),
            details,
        }
    }
}
