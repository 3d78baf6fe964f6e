use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FormcapError, Result};
use crate::types::{VisitType, default_visit_types};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Submissions replace the existing record for the same
    /// `(project, form, subject, visit)` tuple instead of adding another one.
    pub enforce_unique_records: bool,
    pub warn_on_duplicate_records: bool,
    pub audit_log: bool,
    pub default_visit_types: Vec<VisitType>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enforce_unique_records: true,
            warn_on_duplicate_records: true,
            audit_log: true,
            default_visit_types: default_visit_types(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| FormcapError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        config.validate()?;
        tracing::debug!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    pub fn with_unique_records(mut self, enforce: bool) -> Self {
        self.enforce_unique_records = enforce;
        self
    }

    pub fn with_audit_log(mut self, enabled: bool) -> Self {
        self.audit_log = enabled;
        self
    }

    pub fn with_default_visit_types(mut self, visits: Vec<VisitType>) -> Self {
        self.default_visit_types = visits;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for visit in &self.default_visit_types {
            if visit.id.is_empty() {
                return Err(FormcapError::Config {
                    message: format!("default visit '{}' has an empty id", visit.name),
                });
            }
            if !seen.insert(visit.id.as_str()) {
                return Err(FormcapError::Config {
                    message: format!("duplicate default visit id '{}'", visit.id),
                });
            }
        }
        Ok(())
    }
}
