//! Field-level validation.
//!
//! A field produces at most one message. The required check runs first and
//! short-circuits everything else; type-specific checks run in a fixed order
//! and stop at the first failure.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;

use crate::error::SchemaError;
use crate::types::{FieldDefinition, FieldType};

/// Validates one value against one field definition.
///
/// `value` is `None` when the field is absent from the submission. The
/// field's pattern is compiled on every call; use [`CompiledField`] when the
/// same field is validated repeatedly.
pub fn validate_field(field: &FieldDefinition, value: Option<&Value>) -> Option<String> {
    let pattern = match field.compile_pattern() {
        Ok(pattern) => pattern,
        Err(e) => {
            // Schemas are checked before they are saved, so this is a caller bug.
            tracing::warn!("Skipping pattern check: {}", e);
            None
        }
    };
    check_value(field, pattern.as_ref(), value)
}

/// A field definition with its pattern compiled once.
#[derive(Debug, Clone)]
pub struct CompiledField {
    definition: FieldDefinition,
    pattern: Option<Regex>,
}

impl CompiledField {
    pub fn new(definition: FieldDefinition) -> Result<Self, SchemaError> {
        let pattern = definition.compile_pattern()?;
        Ok(Self {
            definition,
            pattern,
        })
    }

    pub fn definition(&self) -> &FieldDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn validate(&self, value: Option<&Value>) -> Option<String> {
        check_value(&self.definition, self.pattern.as_ref(), value)
    }
}

fn check_value(field: &FieldDefinition, pattern: Option<&Regex>, value: Option<&Value>) -> Option<String> {
    let label = &field.label;

    let value = match value {
        Some(v) if !is_empty_value(field.field_type, v) => v,
        _ if field.required => return Some(format!("{label} is required")),
        _ => return None,
    };

    match field.field_type {
        FieldType::Number => check_number(field, value),
        FieldType::Text => check_text(field, pattern, value),
        FieldType::Date | FieldType::Select | FieldType::Radio | FieldType::Checkbox => None,
    }
}

fn check_number(field: &FieldDefinition, value: &Value) -> Option<String> {
    let label = &field.label;
    let Some(number) = parse_number(value) else {
        return Some(format!("{label} must be a valid number"));
    };

    let Some(validation) = &field.validation else {
        return None;
    };

    if let Some(min) = validation.min {
        if number < min {
            return Some(format!("{label} must be at least {min}"));
        }
    }
    if let Some(max) = validation.max {
        if number > max {
            return Some(format!("{label} must be at most {max}"));
        }
    }

    None
}

fn check_text(field: &FieldDefinition, pattern: Option<&Regex>, value: &Value) -> Option<String> {
    let label = &field.label;
    let text = text_of(value);
    let length = text.chars().count();

    if let Some(validation) = &field.validation {
        if let Some(min_length) = validation.min_length {
            if length < min_length {
                return Some(format!("{label} must be at least {min_length} characters"));
            }
        }
        if let Some(max_length) = validation.max_length {
            if length > max_length {
                return Some(format!("{label} must be at most {max_length} characters"));
            }
        }
    }

    match pattern {
        Some(re) if !re.is_match(&text) => Some(format!("{label} format is invalid")),
        _ => None,
    }
}

/// Absent, null and `""` are empty for every type; an empty selection is
/// empty only for checkboxes.
pub(crate) fn is_empty_value(field_type: FieldType, value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => field_type.is_multi_valued() && items.is_empty(),
        _ => false,
    }
}

pub(crate) fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn text_of(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}
