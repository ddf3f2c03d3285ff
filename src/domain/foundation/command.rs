//! Command infrastructure for application handlers.
//!
//! Every command handler takes a `CommandMetadata` alongside its command so
//! that correlation context reaches the emitted events without each handler
//! growing its own parameter list.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata context for command handlers.
///
/// The HTTP adapter fills it from the `x-request-id` header; the expiration
/// scheduler creates one per sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,

    /// Where the command came from (e.g. "http", "scheduler").
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    /// Creates metadata tagged with the given source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            correlation_id: None,
            source: Some(source.into()),
        }
    }

    /// Builder: Add correlation ID for request tracing.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Returns the correlation ID, generating one if not set.
    ///
    /// Call once per command and reuse the value.
    pub fn correlation_id(&self) -> String {
        self.correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Returns the source if set.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
