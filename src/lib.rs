//! # Formcap
//!
//! Dynamic form schemas, field validation and completion tracking for
//! research data capture.
//!
//! ## Features
//!
//! - **Schemas**: typed form fields with structural checks at save time
//! - **Validation**: deterministic per-field messages collected per record
//! - **Completion status**: four-state status per subject, form and visit
//! - **Visit assignments**: which forms are expected at which visit
//! - **Services**: data entry, form saving and dashboards over any entity store
//!
//! ## Quick Start
//!
//! ```rust
//! use formcap::*;
//! use serde_json::json;
//!
//! let schema = FormSchema::new()
//!     .with_field(
//!         FieldDefinition::text("initials", "Initials")
//!             .required()
//!             .with_validation(FieldValidation::new().with_min_length(2)),
//!     )
//!     .with_field(
//!         FieldDefinition::number("age", "Age")
//!             .with_validation(FieldValidation::new().with_min(18.0).with_max(99.0)),
//!     );
//!
//! let validator = RecordValidator::new(&schema).expect("schema is well formed");
//! let values = json!({ "initials": "A", "age": "17" });
//! let result = validator.validate(values.as_object().unwrap());
//!
//! assert!(!result.is_valid);
//! assert_eq!(
//!     result.messages(),
//!     vec!["Initials must be at least 2 characters", "Age must be at least 18"]
//! );
//! ```

pub mod engine;
pub mod error;
pub mod schedule;
pub mod service;
pub mod status;
pub mod storage;
pub mod types;
pub mod validation;

pub use crate::engine::{EngineConfig, Permissions, SessionContext, UserRole};
pub use error::Result;
pub use error::{FormcapError, SchemaError};
pub use schedule::{AssignOutcome, AssignmentIndex, build_assignment_index};
pub use service::{
    DataEntryService, FormService, ProjectService, ProjectSnapshot, Submission, SubmissionOutcome,
};
pub use status::{CompletionStatus, Resolution, resolve_status, resolve_status_detailed};
pub use storage::{Criteria, Entity, EntityKind, EntityStore, MemoryStore, TypedStore, criteria};
pub use types::*;
pub use validation::{
    CompiledField, FieldIssue, RecordValidation, RecordValidator, validate_field, validate_record,
};
