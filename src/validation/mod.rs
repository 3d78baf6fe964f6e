pub mod field_validator;
pub mod record_validator;

use serde::{Deserialize, Serialize};

use crate::types::ValidationStatus;

pub use field_validator::{CompiledField, validate_field};
pub use record_validator::{RecordValidator, validate_record};

/// A failed check, attributed to the field that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Verdict for one submitted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordValidation {
    /// True iff `errors` is empty.
    pub is_valid: bool,

    /// One entry per failing field, in schema order.
    pub errors: Vec<FieldIssue>,
}

impl RecordValidation {
    pub fn from_issues(errors: Vec<FieldIssue>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn success() -> Self {
        Self::from_issues(Vec::new())
    }

    /// Error messages in field order, as stored in `Record::validation_errors`.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn validation_status(&self) -> ValidationStatus {
        ValidationStatus::from_verdict(self.is_valid)
    }
}
