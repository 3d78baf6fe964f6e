use serde_json::Value;

use super::field_validator::{CompiledField, validate_field};
use super::{FieldIssue, RecordValidation};
use crate::error::SchemaError;
use crate::types::{FieldValues, FormSchema};

/// Runs the field validator over every field of `schema`, in schema order.
///
/// Total for well-formed schemas. A schema that fails
/// [`FormSchema::check_structure`] is a precondition violation; use
/// [`RecordValidator::new`] to reject such schemas up front.
pub fn validate_record(schema: &FormSchema, values: &FieldValues) -> RecordValidation {
    let errors = schema
        .iter()
        .filter_map(|field| {
            validate_field(field, lookup(values, &field.name))
                .map(|message| FieldIssue::new(&field.name, message))
        })
        .collect();
    RecordValidation::from_issues(errors)
}

fn lookup<'a>(values: &'a FieldValues, name: &str) -> Option<&'a Value> {
    values.get(name)
}

/// Validator for one structurally checked schema with compiled patterns.
///
/// Holds no mutable state, so one instance can be shared across threads and
/// re-run on every keystroke.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    fields: Vec<CompiledField>,
}

impl RecordValidator {
    pub fn new(schema: &FormSchema) -> Result<Self, SchemaError> {
        schema.check_structure()?;

        let fields = schema
            .iter()
            .cloned()
            .map(CompiledField::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { fields })
    }

    pub fn validate(&self, values: &FieldValues) -> RecordValidation {
        let errors = self
            .fields
            .iter()
            .filter_map(|field| {
                field
                    .validate(lookup(values, field.name()))
                    .map(|message| FieldIssue::new(field.name(), message))
            })
            .collect();
        RecordValidation::from_issues(errors)
    }

    /// Validates a single field by name, for live feedback while typing.
    /// Returns `None` for unknown names as well as for passing values.
    pub fn validate_one(&self, name: &str, value: Option<&Value>) -> Option<String> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .and_then(|f| f.validate(value))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}
