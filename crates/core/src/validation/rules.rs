//! Validation result type and the messages the engine reports.

use serde::{Deserialize, Serialize};

use crate::error::Details;

pub const MSG_SCHEMA_MISMATCH: &str = "This entity is not part of this schema";
pub const MSG_NOT_DEFINED: &str = "This attribute is not defined for this schema.";
pub const MSG_REQUIRED: &str = "This attribute is required.";
pub const MSG_NOT_INTEGER: &str = "Value must be an integer.";

/// Outcome of validating one entity against one schema.
///
/// `message` is only set when the entity belongs to another schema;
/// field-level failures are reported in `messages`, one per attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Details>,
}

impl ValidationResult {
    pub(crate) fn schema_mismatch() -> Self {
        ValidationResult {
            valid: false,
            message: Some(MSG_SCHEMA_MISMATCH.to_string()),
            messages: None,
        }
    }

    /// Per-attribute messages, empty on the schema-mismatch path.
    pub fn field_messages(&self) -> Details {
        self.messages.clone().unwrap_or_default()
    }
}
