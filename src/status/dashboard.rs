//! Grids and counters for the project and subject dashboards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::resolver::{CompletionStatus, resolve_status};
use crate::schedule::AssignmentIndex;
use crate::types::{Form, Record, ValidationStatus, VisitType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormStatusCell {
    pub form_id: String,
    pub form_name: String,
    pub status: CompletionStatus,
}

impl FormStatusCell {
    fn resolve(form: &Form, subject_id: &str, visit_id: Option<&str>, records: &[Record]) -> Self {
        Self {
            form_id: form.id.clone(),
            form_name: form.form_name.clone(),
            status: resolve_status(&form.id, subject_id, visit_id, records),
        }
    }
}

/// One subject's status across every form of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRow {
    pub subject_id: String,
    pub forms: Vec<FormStatusCell>,
}

/// One visit's assigned forms for a single subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRow {
    pub visit: VisitType,
    pub forms: Vec<FormStatusCell>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub complete: usize,
    pub incomplete: usize,
    pub unverified: usize,
    pub not_started: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: CompletionStatus) {
        match status {
            CompletionStatus::Complete => self.complete += 1,
            CompletionStatus::Incomplete => self.incomplete += 1,
            CompletionStatus::Unverified => self.unverified += 1,
            CompletionStatus::NotStarted => self.not_started += 1,
        }
    }

    pub fn get(&self, status: CompletionStatus) -> usize {
        match status {
            CompletionStatus::Complete => self.complete,
            CompletionStatus::Incomplete => self.incomplete,
            CompletionStatus::Unverified => self.unverified,
            CompletionStatus::NotStarted => self.not_started,
        }
    }

    pub fn total(&self) -> usize {
        self.complete + self.incomplete + self.unverified + self.not_started
    }
}

impl<'a> FromIterator<&'a SubjectRow> for StatusCounts {
    fn from_iter<T: IntoIterator<Item = &'a SubjectRow>>(rows: T) -> Self {
        let mut counts = StatusCounts::default();
        for row in rows {
            for cell in &row.forms {
                counts.add(cell.status);
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total_forms: usize,
    pub total_records: usize,
    pub total_subjects: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub status_counts: StatusCounts,
}

fn numeric_key(subject_id: &str) -> u128 {
    let digits: String = subject_id.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u128::MAX)
}

/// Distinct subject ids ordered by the number formed by their digits
/// (`P2` before `P10`). Ids without digits sort as 0; ties keep first-seen
/// order.
pub fn sort_subject_ids<'a, I>(subject_ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut ids: Vec<String> = subject_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect();
    ids.sort_by_key(|id| numeric_key(id));
    ids
}

fn forms_in_display_order(forms: &[Form]) -> Vec<&Form> {
    let mut ordered: Vec<&Form> = forms.iter().collect();
    ordered.sort_by_key(|f| f.order_index);
    ordered
}

/// Status of every form for every subject that has at least one record.
/// Visits are ignored: any record of the form for the subject counts.
pub fn subjects_overview(forms: &[Form], records: &[Record]) -> Vec<SubjectRow> {
    let forms = forms_in_display_order(forms);

    sort_subject_ids(records.iter().map(|r| r.record_id.as_str()))
        .into_iter()
        .map(|subject_id| {
            let cells = forms
                .iter()
                .map(|form| FormStatusCell::resolve(form, &subject_id, None, records))
                .collect();
            SubjectRow {
                subject_id,
                forms: cells,
            }
        })
        .collect()
}

/// Per-visit grid for one subject. Only forms assigned to a visit appear in
/// that visit's row.
pub fn subject_visit_grid(
    subject_id: &str,
    visits: &[VisitType],
    index: &AssignmentIndex,
    forms: &[Form],
    records: &[Record],
) -> Vec<VisitRow> {
    let mut visits: Vec<&VisitType> = visits.iter().collect();
    visits.sort_by_key(|v| v.order);

    visits
        .into_iter()
        .map(|visit| VisitRow {
            visit: visit.clone(),
            forms: index
                .forms_for_visit(&visit.id, forms)
                .into_iter()
                .map(|form| FormStatusCell::resolve(form, subject_id, Some(&visit.id), records))
                .collect(),
        })
        .collect()
}

pub fn project_stats(forms: &[Form], records: &[Record]) -> ProjectStats {
    let overview = subjects_overview(forms, records);

    ProjectStats {
        total_forms: forms.len(),
        total_records: records.len(),
        total_subjects: overview.len(),
        valid_records: records
            .iter()
            .filter(|r| r.validation_status == ValidationStatus::Valid)
            .count(),
        invalid_records: records
            .iter()
            .filter(|r| r.validation_status == ValidationStatus::Invalid)
            .count(),
        status_counts: overview.iter().collect(),
    }
}
