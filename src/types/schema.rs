use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::FieldDefinition;
use crate::error::SchemaError;

/// Ordered field list of a form. Order drives display only; every field is
/// validated independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormSchema {
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDefinition> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Rejects schemas that would make value lookups ambiguous or validation
    /// impossible. Reports the first problem in field order.
    pub fn check_structure(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::with_capacity(self.fields.len());

        for (position, field) in self.fields.iter().enumerate() {
            field.check_structure(position)?;
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateFieldName {
                    name: field.name.clone(),
                });
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a FormSchema {
    type Item = &'a FieldDefinition;
    type IntoIter = std::slice::Iter<'a, FieldDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl FromIterator<FieldDefinition> for FormSchema {
    fn from_iter<T: IntoIterator<Item = FieldDefinition>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for FormSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormSchema({} fields)", self.fields.len())
    }
}
