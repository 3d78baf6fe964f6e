use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FormcapError, Result};

/// A named timepoint in a project's data-collection schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VisitType {
    pub id: String,
    pub name: String,
    /// 1-based position in the schedule.
    pub order: u32,
}

impl VisitType {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
        }
    }
}

/// Schedule used when a project has not configured its own visits.
pub fn default_visit_types() -> Vec<VisitType> {
    [
        ("baseline", "Baseline"),
        ("month1", "Month 1"),
        ("month2", "Month 2"),
        ("month3", "Month 3"),
        ("month6", "Month 6"),
        ("month12", "Month 12"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (id, name))| VisitType::new(id, name, i as u32 + 1))
    .collect()
}

/// Declares that a form is expected at a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormVisitAssignment {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub form_id: String,
    pub visit_type_id: String,
    #[serde(default = "required_by_default")]
    pub is_required: bool,
}

fn required_by_default() -> bool {
    true
}

impl FormVisitAssignment {
    pub fn new(
        project_id: impl Into<String>,
        form_id: impl Into<String>,
        visit_type_id: impl Into<String>,
        is_required: bool,
    ) -> Self {
        Self {
            id: String::new(),
            project_id: project_id.into(),
            form_id: form_id.into(),
            visit_type_id: visit_type_id.into(),
            is_required,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Editable, ordered list of visits for one project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitSchedule {
    visits: Vec<VisitType>,
}

impl VisitSchedule {
    pub fn new(visits: Vec<VisitType>) -> Self {
        Self { visits }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_visit_types())
    }

    /// Appends a visit with a generated id at the end of the schedule.
    pub fn add_visit(&mut self, name: &str) -> Result<&VisitType> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FormcapError::invalid_input("Visit name is required"));
        }

        let visit = VisitType::new(
            format!("visit_{}", Uuid::new_v4().simple()),
            name,
            self.visits.len() as u32 + 1,
        );
        tracing::debug!("Added visit '{}' ({})", visit.name, visit.id);
        self.visits.push(visit);

        Ok(&self.visits[self.visits.len() - 1])
    }

    /// Removes a visit. Remaining visits keep their `order` values.
    pub fn remove_visit(&mut self, visit_id: &str) -> bool {
        let before = self.visits.len();
        self.visits.retain(|v| v.id != visit_id);
        before != self.visits.len()
    }

    pub fn get(&self, visit_id: &str) -> Option<&VisitType> {
        self.visits.iter().find(|v| v.id == visit_id)
    }

    /// Visits sorted by `order`, ties in insertion order.
    pub fn ordered(&self) -> Vec<&VisitType> {
        let mut visits: Vec<&VisitType> = self.visits.iter().collect();
        visits.sort_by_key(|v| v.order);
        visits
    }

    pub fn visits(&self) -> &[VisitType] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn into_visits(self) -> Vec<VisitType> {
        self.visits
    }
}
