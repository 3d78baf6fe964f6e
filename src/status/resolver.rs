use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Record, ValidationStatus};

/// Derived completion state of one form for one subject (and visit).
/// Never stored; recomputed from the record set whenever it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Complete,
    Incomplete,
    Unverified,
    NotStarted,
}

impl CompletionStatus {
    pub const ALL: [CompletionStatus; 4] = [
        CompletionStatus::Complete,
        CompletionStatus::Incomplete,
        CompletionStatus::Unverified,
        CompletionStatus::NotStarted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Complete => "complete",
            CompletionStatus::Incomplete => "incomplete",
            CompletionStatus::Unverified => "unverified",
            CompletionStatus::NotStarted => "not_started",
        }
    }

    /// Human-readable label for dashboards.
    pub fn label(self) -> &'static str {
        match self {
            CompletionStatus::Complete => "Complete",
            CompletionStatus::Incomplete => "Incomplete",
            CompletionStatus::Unverified => "Unverified",
            CompletionStatus::NotStarted => "Not Started",
        }
    }
}

impl From<&ValidationStatus> for CompletionStatus {
    fn from(status: &ValidationStatus) -> Self {
        match status {
            ValidationStatus::Valid => CompletionStatus::Complete,
            ValidationStatus::Invalid => CompletionStatus::Incomplete,
            ValidationStatus::Pending | ValidationStatus::Other(_) => CompletionStatus::Unverified,
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus how many records matched the tuple. More than one match
/// means ingestion let a duplicate through; the first match still decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub status: CompletionStatus,
    pub matches: usize,
}

impl Resolution {
    pub fn is_ambiguous(&self) -> bool {
        self.matches > 1
    }
}

fn matches(record: &Record, form_id: &str, subject_id: &str, visit_id: Option<&str>) -> bool {
    record.form_id == form_id
        && record.record_id == subject_id
        && visit_id.is_none_or(|visit| record.visit_type() == Some(visit))
}

/// First record for the `(form, subject[, visit])` tuple, in collection order.
pub fn find_record<'a>(
    form_id: &str,
    subject_id: &str,
    visit_id: Option<&str>,
    records: &'a [Record],
) -> Option<&'a Record> {
    records
        .iter()
        .find(|r| matches(r, form_id, subject_id, visit_id))
}

/// Derives the completion status of `form_id` for `subject_id`, restricted
/// to `visit_id` when given.
pub fn resolve_status(
    form_id: &str,
    subject_id: &str,
    visit_id: Option<&str>,
    records: &[Record],
) -> CompletionStatus {
    find_record(form_id, subject_id, visit_id, records)
        .map_or(CompletionStatus::NotStarted, |r| {
            CompletionStatus::from(&r.validation_status)
        })
}

/// Like [`resolve_status`] but also counts matching records and logs a
/// warning when the tuple is ambiguous.
pub fn resolve_status_detailed(
    form_id: &str,
    subject_id: &str,
    visit_id: Option<&str>,
    records: &[Record],
) -> Resolution {
    let mut matching = records
        .iter()
        .filter(|r| matches(r, form_id, subject_id, visit_id));

    let Some(first) = matching.next() else {
        return Resolution {
            status: CompletionStatus::NotStarted,
            matches: 0,
        };
    };

    let resolution = Resolution {
        status: CompletionStatus::from(&first.validation_status),
        matches: 1 + matching.count(),
    };

    if resolution.is_ambiguous() {
        tracing::warn!(
            "{} records for form {} subject {} visit {:?}; using {}",
            resolution.matches,
            form_id,
            subject_id,
            visit_id,
            first.id
        );
    }

    resolution
}
