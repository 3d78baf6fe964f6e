use serde_json::json;
use std::sync::Arc;

use super::{authorize, write_audit};
use crate::engine::{EngineConfig, SessionContext};
use crate::error::{FormcapError, Result};
use crate::storage::{EntityKind, EntityStore, TypedStore, criteria};
use crate::types::{AuditLog, Form, Project};

/// Saves and lists forms. A form whose schema fails the structural check is
/// never persisted.
pub struct FormService {
    store: Arc<dyn EntityStore>,
    config: EngineConfig,
}

impl FormService {
    pub fn new(store: Arc<dyn EntityStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub async fn get_form(&self, form_id: &str) -> Result<Form> {
        self.store.require_as(EntityKind::Form, form_id).await
    }

    /// Forms of a project ordered by `order_index`.
    pub async fn list_forms(&self, project_id: &str) -> Result<Vec<Form>> {
        let mut forms: Vec<Form> = self
            .store
            .filter_as(EntityKind::Form, &criteria([("project_id", project_id)]))
            .await?;
        forms.sort_by_key(|f| f.order_index);
        Ok(forms)
    }

    /// Creates the form when it has no id yet, updates it otherwise.
    pub async fn save_form(&self, ctx: &SessionContext, form: Form) -> Result<Form> {
        let project: Project = self
            .store
            .require_as(EntityKind::Project, &form.project_id)
            .await?;
        authorize(ctx, &project, SessionContext::require_edit)?;

        if form.form_name.trim().is_empty() {
            return Err(FormcapError::invalid_input("Form name is required"));
        }

        if let Err(e) = form.schema.check_structure() {
            tracing::warn!("Refusing to save form '{}': {}", form.form_name, e);
            return Err(e.into());
        }

        let (saved, action) = if form.id.is_empty() {
            let created: Form = self.store.create_as(EntityKind::Form, &form).await?;
            (created, "create_form")
        } else {
            let existing: Form = self.store.require_as(EntityKind::Form, &form.id).await?;
            if existing.project_id != form.project_id {
                return Err(FormcapError::invalid_input(format!(
                    "form {} belongs to project {}",
                    form.id, existing.project_id
                )));
            }
            let updated: Form = self
                .store
                .update_as(EntityKind::Form, &form.id, &form)
                .await?;
            (updated, "update_form")
        };

        tracing::info!(
            "Saved form '{}' ({}) with {} fields",
            saved.form_name,
            saved.id,
            saved.schema.len()
        );

        write_audit(
            self.store.as_ref(),
            &self.config,
            &project,
            ctx,
            AuditLog::new(action, EntityKind::Form.as_str(), &saved.id)
                .with_details(json!({ "form_name": saved.form_name })),
        )
        .await?;

        Ok(saved)
    }
}
