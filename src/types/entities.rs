use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{FieldValues, FormSchema, VisitType};
use crate::engine::UserRole;

/// Key in a record's data map that carries the visit it was entered for.
pub const VISIT_TYPE_KEY: &str = "visit_type";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Development,
    Production,
    Analysis,
    Completed,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSettings {
    #[serde(default = "enabled")]
    pub data_validation: bool,
    #[serde(default = "enabled")]
    pub audit_logging: bool,
    #[serde(default = "enabled")]
    pub user_access_control: bool,
    #[serde(default)]
    pub auto_backup: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            data_validation: true,
            audit_logging: true,
            user_access_control: true,
            auto_backup: false,
        }
    }
}

fn one_visit() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "name")]
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub principal_investigator: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub irb_number: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default = "one_visit")]
    pub number_of_visits: u32,
    #[serde(default)]
    pub visit_types: Vec<VisitType>,
    #[serde(default)]
    pub settings: ProjectSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Project {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            project_name: project_name.into(),
            description: String::new(),
            principal_investigator: String::new(),
            institution: String::new(),
            irb_number: String::new(),
            status: ProjectStatus::default(),
            number_of_visits: 1,
            visit_types: Vec::new(),
            settings: ProjectSettings::default(),
            created_by: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_investigator(
        mut self,
        principal_investigator: impl Into<String>,
        institution: impl Into<String>,
    ) -> Self {
        self.principal_investigator = principal_investigator.into();
        self.institution = institution.into();
        self
    }

    pub fn with_irb_number(mut self, irb_number: impl Into<String>) -> Self {
        self.irb_number = irb_number.into();
        self
    }

    pub fn with_visit_types(mut self, visit_types: Vec<VisitType>) -> Self {
        self.number_of_visits = visit_types.len().max(1) as u32;
        self.visit_types = visit_types;
        self
    }

    pub fn with_settings(mut self, settings: ProjectSettings) -> Self {
        self.settings = settings;
        self
    }
}

fn active() -> bool {
    true
}

/// A data-collection form owned by a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Form {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub form_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default, alias = "form_schema")]
    pub schema: FormSchema,
}

impl Form {
    pub fn new(
        project_id: impl Into<String>,
        form_name: impl Into<String>,
        schema: FormSchema,
    ) -> Self {
        Self {
            id: String::new(),
            project_id: project_id.into(),
            form_name: form_name.into(),
            description: String::new(),
            is_active: true,
            order_index: 0,
            schema,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_order_index(mut self, order_index: i64) -> Self {
        self.order_index = order_index;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Verdict stored on a record at submission time.
///
/// Unrecognized strings coming back from the store are kept verbatim so
/// they survive a round trip; they resolve to `unverified`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationStatus {
    Valid,
    Invalid,
    Pending,
    Other(String),
}

impl ValidationStatus {
    pub fn from_verdict(is_valid: bool) -> Self {
        if is_valid {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
            ValidationStatus::Pending => "pending",
            ValidationStatus::Other(raw) => raw,
        }
    }
}

impl Default for ValidationStatus {
    fn default() -> Self {
        ValidationStatus::Pending
    }
}

impl From<String> for ValidationStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "valid" => ValidationStatus::Valid,
            "invalid" => ValidationStatus::Invalid,
            "pending" => ValidationStatus::Pending,
            _ => ValidationStatus::Other(raw),
        }
    }
}

impl From<&str> for ValidationStatus {
    fn from(raw: &str) -> Self {
        ValidationStatus::from(raw.to_string())
    }
}

impl From<ValidationStatus> for String {
    fn from(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted instance of a form for one subject, optionally one visit.
///
/// Records are snapshots: the verdict is the one computed at entry time and
/// is not recomputed when the form's schema changes later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub form_id: String,
    /// Subject identifier (PID).
    pub record_id: String,
    #[serde(default)]
    pub data: FieldValues,
    #[serde(default)]
    pub validation_status: ValidationStatus,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(
        project_id: impl Into<String>,
        form_id: impl Into<String>,
        record_id: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            project_id: project_id.into(),
            form_id: form_id.into(),
            record_id: record_id.into(),
            data: FieldValues::new(),
            validation_status: ValidationStatus::Pending,
            validation_errors: Vec::new(),
            entered_by: None,
            created_date: None,
            updated_date: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_data(mut self, data: FieldValues) -> Self {
        self.data = data;
        self
    }

    pub fn with_status(mut self, status: impl Into<ValidationStatus>) -> Self {
        self.validation_status = status.into();
        self
    }

    pub fn with_visit(mut self, visit_id: impl Into<String>) -> Self {
        self.data
            .insert(VISIT_TYPE_KEY.to_string(), serde_json::Value::String(visit_id.into()));
        self
    }

    /// Visit the record was entered for, if it carries one as a string.
    pub fn visit_type(&self) -> Option<&str> {
        self.data.get(VISIT_TYPE_KEY).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLog {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            project_id: None,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            user_id: None,
            details: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}
