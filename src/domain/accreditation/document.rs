//! Supporting document attached to an accreditation request.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Document snapshot. The content is stored as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

impl Document {
    /// Creates a document, requiring a name and MIME type.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let document = Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        };
        document.validate()?;
        Ok(document)
    }

    /// Checks the fields a deserialized document may have left blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("document.name"));
        }
        if self.mime_type.trim().is_empty() {
            return Err(ValidationError::empty_field("document.mime_type"));
        }
        Ok(())
    }
}
