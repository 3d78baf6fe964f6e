use indexmap::IndexMap;

use crate::types::{Form, FormVisitAssignment};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AssignmentKey {
    form_id: String,
    visit_id: String,
}

impl AssignmentKey {
    fn new(form_id: &str, visit_id: &str) -> Self {
        Self {
            form_id: form_id.to_string(),
            visit_id: visit_id.to_string(),
        }
    }
}

/// Outcome of [`AssignmentIndex::assign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Which forms are expected at which visit, for one project.
///
/// Entries keep the order in which they were first assigned. At most one
/// entry exists per `(form, visit)` pair.
#[derive(Debug, Clone, Default)]
pub struct AssignmentIndex {
    project_id: String,
    entries: IndexMap<AssignmentKey, FormVisitAssignment>,
}

impl AssignmentIndex {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            entries: IndexMap::new(),
        }
    }

    /// Builds the index from persisted assignments in creation order. A
    /// repeated pair updates the earlier entry in place.
    pub fn build<I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = FormVisitAssignment>,
    {
        let mut index = Self::default();
        for assignment in assignments {
            if index.project_id.is_empty() {
                index.project_id = assignment.project_id.clone();
            }
            let key = AssignmentKey::new(&assignment.form_id, &assignment.visit_type_id);
            if let Some(existing) = index.entries.get_mut(&key) {
                tracing::debug!(
                    "Collapsing duplicate assignment of form {} to visit {}",
                    assignment.form_id,
                    assignment.visit_type_id
                );
                existing.is_required = assignment.is_required;
            } else {
                index.entries.insert(key, assignment);
            }
        }
        index
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Forms assigned to `visit_id`, in assignment order. Assignments whose
    /// form is not in `forms` are skipped.
    pub fn forms_for_visit<'a>(&self, visit_id: &str, forms: &'a [Form]) -> Vec<&'a Form> {
        self.form_ids_for_visit(visit_id)
            .filter_map(|form_id| forms.iter().find(|f| f.id == form_id))
            .collect()
    }

    pub fn form_ids_for_visit<'a>(&'a self, visit_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .values()
            .filter(move |a| a.visit_type_id == visit_id)
            .map(|a| a.form_id.as_str())
    }

    pub fn visits_for_form<'a>(&'a self, form_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .values()
            .filter(move |a| a.form_id == form_id)
            .map(|a| a.visit_type_id.as_str())
    }

    pub fn is_assigned(&self, form_id: &str, visit_id: &str) -> bool {
        self.entries.contains_key(&AssignmentKey::new(form_id, visit_id))
    }

    pub fn get(&self, form_id: &str, visit_id: &str) -> Option<&FormVisitAssignment> {
        self.entries.get(&AssignmentKey::new(form_id, visit_id))
    }

    pub fn is_required(&self, form_id: &str, visit_id: &str) -> Option<bool> {
        self.get(form_id, visit_id).map(|a| a.is_required)
    }

    /// Assigns a form to a visit. Re-assigning an existing pair only updates
    /// `is_required`.
    pub fn assign(&mut self, form_id: &str, visit_id: &str, is_required: bool) -> AssignOutcome {
        let key = AssignmentKey::new(form_id, visit_id);
        if let Some(existing) = self.entries.get_mut(&key) {
            if existing.is_required == is_required {
                return AssignOutcome::Unchanged;
            }
            existing.is_required = is_required;
            return AssignOutcome::Updated;
        }

        let assignment =
            FormVisitAssignment::new(self.project_id.clone(), form_id, visit_id, is_required);
        self.entries.insert(key, assignment);
        AssignOutcome::Created
    }

    /// Records the persisted form of an assignment, keeping its store id.
    pub fn insert(&mut self, assignment: FormVisitAssignment) {
        let key = AssignmentKey::new(&assignment.form_id, &assignment.visit_type_id);
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = assignment;
        } else {
            self.entries.insert(key, assignment);
        }
    }

    /// Removes the assignment if present, returning it.
    pub fn unassign(&mut self, form_id: &str, visit_id: &str) -> Option<FormVisitAssignment> {
        self.entries.shift_remove(&AssignmentKey::new(form_id, visit_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormVisitAssignment> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
