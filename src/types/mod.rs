pub mod entities;
pub mod field;
pub mod schema;
pub mod visit;

pub use entities::*;
pub use field::{FieldDefinition, FieldType, FieldValidation};
pub use schema::FormSchema;
pub use visit::{FormVisitAssignment, VisitSchedule, VisitType, default_visit_types};

/// Submitted values keyed by field name.
pub type FieldValues = serde_json::Map<String, serde_json::Value>;
