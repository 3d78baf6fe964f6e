use thiserror::Error;

use crate::storage::EntityKind;

#[derive(Error, Debug)]
pub enum FormcapError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Permission denied: {action}")]
    PermissionDenied { action: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormcapError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn permission_denied(action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
        }
    }
}

/// Structural problems in a form schema. A schema carrying any of these
/// cannot be saved and its form cannot accept submissions.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("field at position {position} has an empty name")]
    EmptyFieldName { position: usize },

    #[error("duplicate field name '{name}'")]
    DuplicateFieldName { name: String },

    #[error("field '{field}' needs at least one option")]
    MissingOptions { field: String },

    #[error("field '{field}' has an invalid pattern '{pattern}'")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl SchemaError {
    /// Name of the offending field, when the error is tied to one.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            SchemaError::EmptyFieldName { .. } => None,
            SchemaError::DuplicateFieldName { name } => Some(name),
            SchemaError::MissingOptions { field } | SchemaError::InvalidPattern { field, .. } => {
                Some(field)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, FormcapError>;
