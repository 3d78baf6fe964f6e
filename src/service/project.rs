use serde_json::json;
use std::sync::Arc;

use super::{authorize, visit_schedule, write_audit};
use crate::engine::{EngineConfig, SessionContext};
use crate::error::{FormcapError, Result};
use crate::schedule::{AssignOutcome, AssignmentIndex};
use crate::status::{
    CompletionStatus, ProjectStats, SubjectRow, VisitRow, project_stats, resolve_status,
    resolve_status_detailed, subject_visit_grid, subjects_overview,
};
use crate::storage::{EntityKind, EntityStore, TypedStore, criteria};
use crate::types::{AuditLog, Form, FormVisitAssignment, Project, Record, VisitType};

/// Everything the dashboards need, fetched in one go. Stale as soon as a
/// record is written; fetch a new one to observe the write.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub project: Project,
    /// Ordered by `order_index`.
    pub forms: Vec<Form>,
    pub records: Vec<Record>,
    pub assignments: AssignmentIndex,
    pub visits: Vec<VisitType>,
    warn_on_duplicates: bool,
}

impl ProjectSnapshot {
    pub fn status(&self, form_id: &str, subject_id: &str, visit_id: Option<&str>) -> CompletionStatus {
        if self.warn_on_duplicates {
            resolve_status_detailed(form_id, subject_id, visit_id, &self.records).status
        } else {
            resolve_status(form_id, subject_id, visit_id, &self.records)
        }
    }

    pub fn subjects_overview(&self) -> Vec<SubjectRow> {
        subjects_overview(&self.forms, &self.records)
    }

    pub fn subject_visit_grid(&self, subject_id: &str) -> Vec<VisitRow> {
        subject_visit_grid(
            subject_id,
            &self.visits,
            &self.assignments,
            &self.forms,
            &self.records,
        )
    }

    pub fn forms_for_visit(&self, visit_id: &str) -> Vec<&Form> {
        self.assignments.forms_for_visit(visit_id, &self.forms)
    }

    pub fn stats(&self) -> ProjectStats {
        project_stats(&self.forms, &self.records)
    }

    pub fn subject_records(&self, subject_id: &str) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| r.record_id == subject_id)
            .collect()
    }
}

/// Project-level reads and the mutations that go with the dashboards.
pub struct ProjectService {
    store: Arc<dyn EntityStore>,
    config: EngineConfig,
}

impl ProjectService {
    pub fn new(store: Arc<dyn EntityStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Stores a new project. Projects start in whatever status they carry,
    /// `development` unless set.
    pub async fn create_project(&self, ctx: &SessionContext, mut project: Project) -> Result<Project> {
        if project.project_name.trim().is_empty() {
            return Err(FormcapError::invalid_input("Project name is required"));
        }
        authorize(ctx, &project, SessionContext::require_edit)?;

        if project.created_by.is_none() {
            project.created_by = Some(ctx.user_id.clone());
        }
        let created: Project = self.store.create_as(EntityKind::Project, &project).await?;

        tracing::info!(
            "Created project '{}' ({}) in {:?}",
            created.project_name,
            created.id,
            created.status
        );
        write_audit(
            self.store.as_ref(),
            &self.config,
            &created,
            ctx,
            AuditLog::new("create_project", EntityKind::Project.as_str(), &created.id)
                .with_details(json!({ "project_name": created.project_name })),
        )
        .await?;

        Ok(created)
    }

    pub async fn snapshot(&self, project_id: &str) -> Result<ProjectSnapshot> {
        let project: Project = self
            .store
            .require_as(EntityKind::Project, project_id)
            .await?;
        let by_project = criteria([("project_id", project_id)]);

        let mut forms: Vec<Form> = self.store.filter_as(EntityKind::Form, &by_project).await?;
        forms.sort_by_key(|f| f.order_index);

        let records: Vec<Record> = self
            .store
            .filter_as(EntityKind::Record, &by_project)
            .await?;
        let assignments: Vec<FormVisitAssignment> = self
            .store
            .filter_as(EntityKind::FormVisitAssignment, &by_project)
            .await?;

        tracing::debug!(
            "Loaded project {}: {} forms, {} records, {} assignments",
            project_id,
            forms.len(),
            records.len(),
            assignments.len()
        );

        let mut assignments = AssignmentIndex::build(assignments);
        if assignments.is_empty() {
            assignments = AssignmentIndex::for_project(project_id);
        }

        Ok(ProjectSnapshot {
            visits: visit_schedule(&project, &self.config),
            project,
            forms,
            records,
            assignments,
            warn_on_duplicates: self.config.warn_on_duplicate_records,
        })
    }

    async fn checked_target(
        &self,
        ctx: &SessionContext,
        project_id: &str,
        form_id: &str,
        visit_id: &str,
    ) -> Result<Project> {
        let project: Project = self
            .store
            .require_as(EntityKind::Project, project_id)
            .await?;
        authorize(ctx, &project, SessionContext::require_edit)?;

        let form: Form = self.store.require_as(EntityKind::Form, form_id).await?;
        if form.project_id != project.id {
            return Err(FormcapError::invalid_input(format!(
                "form {form_id} does not belong to project {project_id}"
            )));
        }
        if !visit_schedule(&project, &self.config)
            .iter()
            .any(|v| v.id == visit_id)
        {
            return Err(FormcapError::invalid_input(format!(
                "visit {visit_id} is not part of the project schedule"
            )));
        }

        Ok(project)
    }

    async fn stored_assignments(
        &self,
        project_id: &str,
        form_id: &str,
        visit_id: &str,
    ) -> Result<Vec<FormVisitAssignment>> {
        self.store
            .filter_as(
                EntityKind::FormVisitAssignment,
                &criteria([
                    ("project_id", project_id),
                    ("form_id", form_id),
                    ("visit_type_id", visit_id),
                ]),
            )
            .await
    }

    /// Expects `form_id` at `visit_id`. Idempotent: an existing assignment
    /// is updated in place, never duplicated.
    pub async fn assign_form(
        &self,
        ctx: &SessionContext,
        project_id: &str,
        form_id: &str,
        visit_id: &str,
        is_required: bool,
    ) -> Result<AssignOutcome> {
        let project = self
            .checked_target(ctx, project_id, form_id, visit_id)
            .await?;
        let existing = self.stored_assignments(project_id, form_id, visit_id).await?;

        let outcome = match existing.first() {
            Some(current) if current.is_required == is_required => AssignOutcome::Unchanged,
            Some(current) => {
                let mut updated = current.clone();
                updated.is_required = is_required;
                self.store
                    .update_as(EntityKind::FormVisitAssignment, &current.id, &updated)
                    .await?;
                AssignOutcome::Updated
            }
            None => {
                let assignment = FormVisitAssignment::new(project_id, form_id, visit_id, is_required);
                self.store
                    .create_as(EntityKind::FormVisitAssignment, &assignment)
                    .await?;
                AssignOutcome::Created
            }
        };

        if outcome != AssignOutcome::Unchanged {
            tracing::info!(
                "Assigned form {} to visit {} (required: {})",
                form_id,
                visit_id,
                is_required
            );
            write_audit(
                self.store.as_ref(),
                &self.config,
                &project,
                ctx,
                AuditLog::new("assign_form", EntityKind::FormVisitAssignment.as_str(), form_id)
                    .with_details(json!({ "visit_type_id": visit_id, "is_required": is_required })),
            )
            .await?;
        }

        Ok(outcome)
    }

    /// Removes every stored assignment of `form_id` to `visit_id`. Returns
    /// false when there was none.
    pub async fn unassign_form(
        &self,
        ctx: &SessionContext,
        project_id: &str,
        form_id: &str,
        visit_id: &str,
    ) -> Result<bool> {
        let project = self
            .checked_target(ctx, project_id, form_id, visit_id)
            .await?;

        let mut removed = false;
        for assignment in self.stored_assignments(project_id, form_id, visit_id).await? {
            removed |= self
                .store
                .delete(EntityKind::FormVisitAssignment, &assignment.id)
                .await?;
        }

        if removed {
            tracing::info!("Unassigned form {} from visit {}", form_id, visit_id);
            write_audit(
                self.store.as_ref(),
                &self.config,
                &project,
                ctx,
                AuditLog::new("unassign_form", EntityKind::FormVisitAssignment.as_str(), form_id)
                    .with_details(json!({ "visit_type_id": visit_id })),
            )
            .await?;
        }

        Ok(removed)
    }

    /// Deletes every record of one subject. Returns how many were removed.
    pub async fn delete_subject(
        &self,
        ctx: &SessionContext,
        project_id: &str,
        subject_id: &str,
    ) -> Result<usize> {
        let project: Project = self
            .store
            .require_as(EntityKind::Project, project_id)
            .await?;
        authorize(ctx, &project, SessionContext::require_delete)?;

        let records: Vec<Record> = self
            .store
            .filter_as(
                EntityKind::Record,
                &criteria([("project_id", project_id), ("record_id", subject_id)]),
            )
            .await?;

        let mut deleted = 0;
        for record in &records {
            if self.store.delete(EntityKind::Record, &record.id).await? {
                deleted += 1;
            }
        }

        tracing::info!("Deleted {} records of subject {}", deleted, subject_id);
        write_audit(
            self.store.as_ref(),
            &self.config,
            &project,
            ctx,
            AuditLog::new("delete_subject", EntityKind::Record.as_str(), subject_id)
                .with_details(json!({ "deleted": deleted })),
        )
        .await?;

        Ok(deleted)
    }
}
