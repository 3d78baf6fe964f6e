use serde_json::{Value, json};
use std::sync::Arc;

use super::{authorize, visit_schedule, write_audit};
use crate::engine::{EngineConfig, SessionContext};
use crate::error::{FormcapError, Result};
use crate::storage::{EntityKind, EntityStore, TypedStore, criteria};
use crate::types::{AuditLog, FieldValues, Form, Project, Record, VISIT_TYPE_KEY, ValidationStatus};
use crate::validation::{RecordValidation, RecordValidator};

/// Values captured for one form, one subject and optionally one visit.
#[derive(Debug, Clone)]
pub struct Submission {
    pub project_id: String,
    pub form_id: String,
    pub subject_id: String,
    pub visit_id: Option<String>,
    pub values: FieldValues,
}

impl Submission {
    pub fn new(
        project_id: impl Into<String>,
        form_id: impl Into<String>,
        subject_id: impl Into<String>,
        values: FieldValues,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            form_id: form_id.into(),
            subject_id: subject_id.into(),
            visit_id: None,
            values,
        }
    }

    pub fn for_visit(mut self, visit_id: impl Into<String>) -> Self {
        self.visit_id = Some(visit_id.into());
        self
    }

    /// The visit this submission is for, taken from `visit_id` or from a
    /// `visit_type` entry in the values. Both may be given only if they agree.
    pub fn effective_visit(&self) -> Result<Option<String>> {
        let from_values = match self.values.get(VISIT_TYPE_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                return Err(FormcapError::invalid_input(format!(
                    "{VISIT_TYPE_KEY} must be a string, got {other}"
                )));
            }
        };

        match (self.visit_id.as_deref(), from_values) {
            (Some(given), Some(stamped)) if given != stamped => {
                Err(FormcapError::invalid_input(format!(
                    "visit {given} does not match {VISIT_TYPE_KEY} {stamped} in the values"
                )))
            }
            (Some(given), _) => Ok(Some(given.to_string())),
            (None, stamped) => Ok(stamped.map(str::to_string)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub record: Record,
    pub validation: RecordValidation,
    /// True when an existing record for the same tuple was overwritten.
    pub replaced: bool,
}

/// Turns submissions into persisted records.
///
/// Invalid values never block the submission: the record is stored as
/// `invalid` with its messages attached. A broken schema does block it.
pub struct DataEntryService {
    store: Arc<dyn EntityStore>,
    config: EngineConfig,
}

impl DataEntryService {
    pub fn new(store: Arc<dyn EntityStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub async fn submit(
        &self,
        ctx: &SessionContext,
        submission: Submission,
    ) -> Result<SubmissionOutcome> {
        let subject_id = submission.subject_id.trim();
        if subject_id.is_empty() {
            return Err(FormcapError::invalid_input("Subject ID is required"));
        }
        let visit_id = submission.effective_visit()?;

        let form: Form = self
            .store
            .require_as(EntityKind::Form, &submission.form_id)
            .await?;
        if form.project_id != submission.project_id {
            return Err(FormcapError::invalid_input(format!(
                "form {} does not belong to project {}",
                form.id, submission.project_id
            )));
        }
        if !form.is_active {
            return Err(FormcapError::invalid_input(format!(
                "form '{}' is not accepting submissions",
                form.form_name
            )));
        }

        let project: Project = self
            .store
            .require_as(EntityKind::Project, &form.project_id)
            .await?;
        authorize(ctx, &project, SessionContext::require_edit)?;

        if let Some(visit_id) = &visit_id {
            if !visit_schedule(&project, &self.config)
                .iter()
                .any(|v| &v.id == visit_id)
            {
                return Err(FormcapError::invalid_input(format!(
                    "visit {visit_id} is not part of the project schedule"
                )));
            }
        }

        let validation = if project.settings.data_validation {
            RecordValidator::new(&form.schema)?.validate(&submission.values)
        } else {
            form.schema.check_structure()?;
            RecordValidation::success()
        };
        let status = if project.settings.data_validation {
            validation.validation_status()
        } else {
            ValidationStatus::Pending
        };

        let mut data = submission.values;
        data.remove(VISIT_TYPE_KEY);
        if let Some(visit_id) = &visit_id {
            data.insert(VISIT_TYPE_KEY.to_string(), Value::String(visit_id.clone()));
        }

        let mut record = Record::new(&project.id, &form.id, subject_id)
            .with_data(data)
            .with_status(status);
        record.validation_errors = validation.messages();
        record.entered_by = Some(ctx.user_id.clone());

        let existing = if self.config.enforce_unique_records {
            self.find_existing(&record, visit_id.as_deref())
                .await?
        } else {
            None
        };

        let replaced = existing.is_some();
        let saved: Record = match existing {
            Some(existing) => {
                self.store
                    .update_as(EntityKind::Record, &existing.id, &record)
                    .await?
            }
            None => self.store.create_as(EntityKind::Record, &record).await?,
        };

        tracing::info!(
            "Stored record {} for subject {} on form {}: {} ({} errors{})",
            saved.id,
            saved.record_id,
            saved.form_id,
            saved.validation_status,
            saved.validation_errors.len(),
            if replaced { ", replaced" } else { "" }
        );

        write_audit(
            self.store.as_ref(),
            &self.config,
            &project,
            ctx,
            AuditLog::new(
                if replaced { "update_record" } else { "create_record" },
                EntityKind::Record.as_str(),
                &saved.id,
            )
            .with_details(json!({
                "form_id": saved.form_id,
                "record_id": saved.record_id,
                "visit_type": visit_id,
                "validation_status": saved.validation_status,
            })),
        )
        .await?;

        Ok(SubmissionOutcome {
            record: saved,
            validation,
            replaced,
        })
    }

    async fn find_existing(&self, record: &Record, visit_id: Option<&str>) -> Result<Option<Record>> {
        let candidates: Vec<Record> = self
            .store
            .filter_as(
                EntityKind::Record,
                &criteria([
                    ("project_id", record.project_id.as_str()),
                    ("form_id", record.form_id.as_str()),
                    ("record_id", record.record_id.as_str()),
                ]),
            )
            .await?;

        // Without a visit only visit-less records count as the same tuple.
        let same_tuple: Vec<&Record> = match visit_id {
            Some(_) => candidates
                .iter()
                .filter(|r| r.visit_type() == visit_id)
                .collect(),
            None => candidates.iter().filter(|r| r.visit_type().is_none()).collect(),
        };

        if same_tuple.len() > 1 && self.config.warn_on_duplicate_records {
            tracing::warn!(
                "{} records already exist for subject {} on form {}; updating {}",
                same_tuple.len(),
                record.record_id,
                record.form_id,
                same_tuple[0].id
            );
        }

        Ok(same_tuple.first().map(|r| (*r).clone()))
    }
}
