//! Orchestration of the pure core against an [`EntityStore`].
//!
//! Services take the acting user as an explicit [`SessionContext`] and
//! return store failures as errors; nothing here substitutes data for a
//! failed fetch.

pub mod data_entry;
pub mod forms;
pub mod project;

pub use data_entry::{DataEntryService, Submission, SubmissionOutcome};
pub use forms::FormService;
pub use project::{ProjectService, ProjectSnapshot};

use crate::engine::{EngineConfig, SessionContext};
use crate::error::Result;
use crate::storage::{EntityKind, EntityStore, TypedStore};
use crate::types::{AuditLog, Project, VisitType};

/// Role checks only apply to projects with access control switched on.
pub(crate) fn authorize(
    ctx: &SessionContext,
    project: &Project,
    check: fn(&SessionContext) -> Result<()>,
) -> Result<()> {
    if project.settings.user_access_control {
        check(ctx)
    } else {
        Ok(())
    }
}

pub(crate) async fn write_audit(
    store: &dyn EntityStore,
    config: &EngineConfig,
    project: &Project,
    ctx: &SessionContext,
    entry: AuditLog,
) -> Result<()> {
    if !config.audit_log || !project.settings.audit_logging {
        return Ok(());
    }

    let entry = entry.with_project(&project.id).with_user(&ctx.user_id);
    store.create_as(EntityKind::AuditLog, &entry).await?;
    Ok(())
}

/// The project's own schedule, or the configured default when it has none.
pub(crate) fn visit_schedule(project: &Project, config: &EngineConfig) -> Vec<VisitType> {
    if project.visit_types.is_empty() {
        config.default_visit_types.clone()
    } else {
        project.visit_types.clone()
    }
}
