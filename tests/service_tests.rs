mod common;

use async_trait::async_trait;
use common::{admin, editor, seeded_store, values, viewer};
use formcap::*;
use serde_json::json;
use std::sync::Arc;

fn valid_values() -> FieldValues {
    values(json!({
        "initials": "JD",
        "age": "42",
        "symptoms": ["Fever"]
    }))
}

async fn audit_actions(store: &MemoryStore) -> Vec<String> {
    store
        .list(EntityKind::AuditLog)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_submit_valid_record() {
    let store = seeded_store().await;
    let service = DataEntryService::new(store.clone(), EngineConfig::default());

    let outcome = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", " P001 ", valid_values()).for_visit("baseline"),
        )
        .await
        .unwrap();

    assert!(outcome.validation.is_valid);
    assert!(!outcome.replaced);
    let record = &outcome.record;
    assert_eq!(record.record_id, "P001");
    assert_eq!(record.validation_status, ValidationStatus::Valid);
    assert!(record.validation_errors.is_empty());
    assert_eq!(record.entered_by.as_deref(), Some("user-editor"));
    assert_eq!(record.visit_type(), Some("baseline"));

    assert_eq!(audit_actions(&store).await, vec!["create_record"]);
}

#[tokio::test]
async fn test_invalid_values_are_still_stored() {
    let store = seeded_store().await;
    let service = DataEntryService::new(store.clone(), EngineConfig::default());

    let outcome = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P001", values(json!({ "age": "200" }))),
        )
        .await
        .unwrap();

    assert!(!outcome.validation.is_valid);
    assert_eq!(outcome.record.validation_status, ValidationStatus::Invalid);
    assert_eq!(
        outcome.record.validation_errors,
        vec![
            "Initials is required",
            "Age must be at most 99",
            "Symptoms is required"
        ]
    );
    assert_eq!(store.len(EntityKind::Record).await, 1);
}

#[tokio::test]
async fn test_resubmission_replaces_record_for_same_tuple() {
    let store = seeded_store().await;
    let service = DataEntryService::new(store.clone(), EngineConfig::default());
    let ctx = editor();

    let first = service
        .submit(
            &ctx,
            Submission::new("proj-1", "form-demo", "P001", values(json!({}))).for_visit("baseline"),
        )
        .await
        .unwrap();
    assert_eq!(first.record.validation_status, ValidationStatus::Invalid);

    let second = service
        .submit(
            &ctx,
            Submission::new("proj-1", "form-demo", "P001", valid_values()).for_visit("baseline"),
        )
        .await
        .unwrap();
    assert!(second.replaced);
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(second.record.validation_status, ValidationStatus::Valid);
    assert!(second.record.validation_errors.is_empty());

    // A different visit is a different tuple.
    let third = service
        .submit(
            &ctx,
            Submission::new("proj-1", "form-demo", "P001", valid_values()).for_visit("month1"),
        )
        .await
        .unwrap();
    assert!(!third.replaced);
    assert_eq!(store.len(EntityKind::Record).await, 2);

    assert_eq!(
        audit_actions(&store).await,
        vec!["create_record", "update_record", "create_record"]
    );
}

#[tokio::test]
async fn test_visit_carried_in_values_identifies_the_tuple() {
    let store = seeded_store().await;
    let service = DataEntryService::new(store.clone(), EngineConfig::default());
    let mut stamped = valid_values();
    stamped.insert("visit_type".to_string(), json!("baseline"));

    let first = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P01", stamped.clone()),
        )
        .await
        .unwrap();
    assert_eq!(first.record.visit_type(), Some("baseline"));

    let second = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P01", stamped.clone()),
        )
        .await
        .unwrap();
    assert!(second.replaced);
    assert_eq!(second.record.id, first.record.id);

    // The explicit visit and the stamped one name the same tuple.
    let explicit = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P01", valid_values()).for_visit("baseline"),
        )
        .await
        .unwrap();
    assert!(explicit.replaced);
    assert_eq!(store.len(EntityKind::Record).await, 1);
}

#[tokio::test]
async fn test_visit_in_values_is_checked_against_the_schedule() {
    let store = seeded_store().await;
    let service = DataEntryService::new(store.clone(), EngineConfig::default());

    let mut unscheduled = valid_values();
    unscheduled.insert("visit_type".to_string(), json!("month99"));
    let result = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P02", unscheduled),
        )
        .await;
    assert!(matches!(result, Err(FormcapError::InvalidInput { .. })));

    let mut conflicting = valid_values();
    conflicting.insert("visit_type".to_string(), json!("month1"));
    let result = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P02", conflicting).for_visit("baseline"),
        )
        .await;
    assert!(matches!(result, Err(FormcapError::InvalidInput { .. })));

    let mut not_text = valid_values();
    not_text.insert("visit_type".to_string(), json!(3));
    let result = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P02", not_text),
        )
        .await;
    assert!(matches!(result, Err(FormcapError::InvalidInput { .. })));

    assert_eq!(store.len(EntityKind::Record).await, 0);
}

#[tokio::test]
async fn test_blank_visit_in_values_means_no_visit() {
    let store = seeded_store().await;
    let service = DataEntryService::new(store.clone(), EngineConfig::default());
    let mut blank = valid_values();
    blank.insert("visit_type".to_string(), json!(""));

    let outcome = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P03", blank),
        )
        .await
        .unwrap();
    assert_eq!(outcome.record.visit_type(), None);
    assert!(!outcome.record.data.contains_key("visit_type"));
}

#[tokio::test]
async fn test_duplicates_allowed_when_uniqueness_disabled() {
    let store = seeded_store().await;
    let service = DataEntryService::new(
        store.clone(),
        EngineConfig::default().with_unique_records(false),
    );

    for _ in 0..2 {
        service
            .submit(
                &editor(),
                Submission::new("proj-1", "form-demo", "P001", valid_values()),
            )
            .await
            .unwrap();
    }
    assert_eq!(store.len(EntityKind::Record).await, 2);
}

#[tokio::test]
async fn test_submission_rejections() {
    let store = seeded_store().await;
    let service = DataEntryService::new(store.clone(), EngineConfig::default());

    let viewer_attempt = service
        .submit(
            &viewer(),
            Submission::new("proj-1", "form-demo", "P001", valid_values()),
        )
        .await;
    assert!(matches!(viewer_attempt, Err(FormcapError::PermissionDenied { .. })));

    let blank_subject = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "  ", valid_values()),
        )
        .await;
    assert!(matches!(blank_subject, Err(FormcapError::InvalidInput { .. })));

    let unknown_form = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-missing", "P001", valid_values()),
        )
        .await;
    assert!(matches!(
        unknown_form,
        Err(FormcapError::NotFound { kind: EntityKind::Form, .. })
    ));

    let wrong_project = service
        .submit(
            &editor(),
            Submission::new("proj-2", "form-demo", "P001", valid_values()),
        )
        .await;
    assert!(matches!(wrong_project, Err(FormcapError::InvalidInput { .. })));

    let unknown_visit = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P001", valid_values()).for_visit("month99"),
        )
        .await;
    assert!(matches!(unknown_visit, Err(FormcapError::InvalidInput { .. })));

    assert_eq!(store.len(EntityKind::Record).await, 0);
}

#[tokio::test]
async fn test_broken_schema_blocks_entry() {
    let store = seeded_store().await;
    let broken = Form::new(
        "proj-1",
        "Broken",
        FormSchema::new()
            .with_field(FieldDefinition::text("a", "A"))
            .with_field(FieldDefinition::text("a", "A")),
    )
    .with_id("form-broken");
    store.create_as(EntityKind::Form, &broken).await.unwrap();

    let service = DataEntryService::new(store.clone(), EngineConfig::default());
    let result = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-broken", "P001", values(json!({ "a": "x" }))),
        )
        .await;

    assert!(matches!(
        result,
        Err(FormcapError::Schema(SchemaError::DuplicateFieldName { .. }))
    ));
    assert_eq!(store.len(EntityKind::Record).await, 0);
}

#[tokio::test]
async fn test_inactive_form_refuses_submissions() {
    let store = seeded_store().await;
    let inactive = Form::new("proj-1", "Retired", FormSchema::new())
        .with_id("form-retired")
        .inactive();
    store.create_as(EntityKind::Form, &inactive).await.unwrap();

    let service = DataEntryService::new(store.clone(), EngineConfig::default());
    let result = service
        .submit(
            &editor(),
            Submission::new("proj-1", "form-retired", "P001", FieldValues::new()),
        )
        .await;
    assert!(matches!(result, Err(FormcapError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_project_settings_change_behaviour() {
    let store = Arc::new(MemoryStore::new());
    let settings = ProjectSettings {
        data_validation: false,
        audit_logging: false,
        user_access_control: false,
        auto_backup: false,
    };
    store
        .create_as(
            EntityKind::Project,
            &Project::new("Open").with_id("proj-open").with_settings(settings),
        )
        .await
        .unwrap();
    store
        .create_as(
            EntityKind::Form,
            &Form::new("proj-open", "Intake", common::create_test_schema()).with_id("form-intake"),
        )
        .await
        .unwrap();

    let service = DataEntryService::new(store.clone(), EngineConfig::default());
    let outcome = service
        .submit(
            &viewer(),
            Submission::new("proj-open", "form-intake", "P001", FieldValues::new()),
        )
        .await
        .unwrap();

    assert_eq!(outcome.record.validation_status, ValidationStatus::Pending);
    assert!(outcome.record.validation_errors.is_empty());
    assert!(audit_actions(&store).await.is_empty());
}

#[tokio::test]
async fn test_form_service_save_and_list() {
    let store = seeded_store().await;
    let forms = FormService::new(store.clone(), EngineConfig::default());

    let created = forms
        .save_form(
            &editor(),
            Form::new("proj-1", "Adverse Events", common::create_test_schema()).with_order_index(0),
        )
        .await
        .unwrap();
    assert!(!created.id.is_empty());

    let listed: Vec<_> = forms
        .list_forms("proj-1")
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.form_name)
        .collect();
    assert_eq!(listed, vec!["Adverse Events", "Demographics", "Vitals"]);

    let mut renamed = created.clone();
    renamed.form_name = "AE Log".to_string();
    let updated = forms.save_form(&editor(), renamed).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(forms.get_form(&created.id).await.unwrap().form_name, "AE Log");

    let mut moved = updated.clone();
    moved.project_id = "proj-2".to_string();
    assert!(matches!(
        forms.save_form(&editor(), moved).await,
        Err(FormcapError::NotFound { kind: EntityKind::Project, .. })
    ));

    assert_eq!(
        audit_actions(&store).await,
        vec!["create_form", "update_form"]
    );
}

#[tokio::test]
async fn test_form_service_refuses_broken_schema() {
    let store = seeded_store().await;
    let forms = FormService::new(store.clone(), EngineConfig::default());

    let broken = Form::new(
        "proj-1",
        "Broken",
        FormSchema::new().with_field(FieldDefinition::new("arm", "Arm", FieldType::Radio)),
    );
    let result = forms.save_form(&admin(), broken).await;

    assert!(matches!(
        result,
        Err(FormcapError::Schema(SchemaError::MissingOptions { .. }))
    ));
    assert_eq!(store.len(EntityKind::Form).await, 2);

    let viewer_attempt = forms
        .save_form(&viewer(), Form::new("proj-1", "Fine", FormSchema::new()))
        .await;
    assert!(matches!(viewer_attempt, Err(FormcapError::PermissionDenied { .. })));
}

#[tokio::test]
async fn test_project_snapshot_dashboards() {
    let store = seeded_store().await;
    let config = EngineConfig::default();
    let entry = DataEntryService::new(store.clone(), config.clone());
    let projects = ProjectService::new(store.clone(), config);
    let ctx = editor();

    assert_eq!(
        projects
            .assign_form(&ctx, "proj-1", "form-vitals", "baseline", true)
            .await
            .unwrap(),
        AssignOutcome::Created
    );
    projects
        .assign_form(&ctx, "proj-1", "form-demo", "baseline", true)
        .await
        .unwrap();

    entry
        .submit(
            &ctx,
            Submission::new("proj-1", "form-demo", "P002", valid_values()).for_visit("baseline"),
        )
        .await
        .unwrap();
    entry
        .submit(
            &ctx,
            Submission::new("proj-1", "form-vitals", "P010", FieldValues::new()).for_visit("baseline"),
        )
        .await
        .unwrap();

    let snapshot = projects.snapshot("proj-1").await.unwrap();
    assert_eq!(snapshot.visits.len(), 6);
    assert_eq!(snapshot.forms[0].id, "form-demo");

    let overview = snapshot.subjects_overview();
    let subjects: Vec<_> = overview.iter().map(|r| r.subject_id.as_str()).collect();
    assert_eq!(subjects, vec!["P002", "P010"]);
    assert_eq!(overview[0].forms[0].status, CompletionStatus::Complete);
    assert_eq!(overview[0].forms[1].status, CompletionStatus::NotStarted);
    assert_eq!(overview[1].forms[1].status, CompletionStatus::Incomplete);

    let grid = snapshot.subject_visit_grid("P002");
    assert_eq!(grid[0].visit.id, "baseline");
    let baseline: Vec<_> = grid[0].forms.iter().map(|c| c.form_id.as_str()).collect();
    assert_eq!(baseline, vec!["form-vitals", "form-demo"]);
    assert!(grid[1..].iter().all(|row| row.forms.is_empty()));

    assert_eq!(
        snapshot.status("form-demo", "P002", Some("baseline")),
        CompletionStatus::Complete
    );
    assert_eq!(
        snapshot.status("form-demo", "P002", Some("month1")),
        CompletionStatus::NotStarted
    );
    assert_eq!(snapshot.forms_for_visit("baseline").len(), 2);
    assert_eq!(snapshot.subject_records("P010").len(), 1);

    let stats = snapshot.stats();
    assert_eq!(stats.total_subjects, 2);
    assert_eq!(stats.valid_records, 1);
    assert_eq!(stats.invalid_records, 1);
}

#[tokio::test]
async fn test_assignment_persistence_is_idempotent() {
    let store = seeded_store().await;
    let projects = ProjectService::new(store.clone(), EngineConfig::default());
    let ctx = editor();

    let first = projects
        .assign_form(&ctx, "proj-1", "form-demo", "month1", true)
        .await
        .unwrap();
    let again = projects
        .assign_form(&ctx, "proj-1", "form-demo", "month1", true)
        .await
        .unwrap();
    let relaxed = projects
        .assign_form(&ctx, "proj-1", "form-demo", "month1", false)
        .await
        .unwrap();
    assert_eq!(
        (first, again, relaxed),
        (AssignOutcome::Created, AssignOutcome::Unchanged, AssignOutcome::Updated)
    );
    assert_eq!(store.len(EntityKind::FormVisitAssignment).await, 1);

    let snapshot = projects.snapshot("proj-1").await.unwrap();
    assert_eq!(
        snapshot.assignments.is_required("form-demo", "month1"),
        Some(false)
    );

    assert!(projects
        .unassign_form(&ctx, "proj-1", "form-demo", "month1")
        .await
        .unwrap());
    assert!(!projects
        .unassign_form(&ctx, "proj-1", "form-demo", "month1")
        .await
        .unwrap());

    let snapshot = projects.snapshot("proj-1").await.unwrap();
    assert!(!snapshot.assignments.is_assigned("form-demo", "month1"));
    assert_eq!(snapshot.assignments.project_id(), "proj-1");

    let bad_visit = projects
        .assign_form(&ctx, "proj-1", "form-demo", "month99", true)
        .await;
    assert!(matches!(bad_visit, Err(FormcapError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_delete_subject_requires_administrator() {
    let store = seeded_store().await;
    let config = EngineConfig::default();
    let entry = DataEntryService::new(store.clone(), config.clone());
    let projects = ProjectService::new(store.clone(), config);

    for (form, visit) in [("form-demo", "baseline"), ("form-vitals", "baseline"), ("form-demo", "month1")] {
        entry
            .submit(
                &editor(),
                Submission::new("proj-1", form, "P001", valid_values()).for_visit(visit),
            )
            .await
            .unwrap();
    }
    entry
        .submit(
            &editor(),
            Submission::new("proj-1", "form-demo", "P002", valid_values()),
        )
        .await
        .unwrap();

    let denied = projects.delete_subject(&editor(), "proj-1", "P001").await;
    assert!(matches!(denied, Err(FormcapError::PermissionDenied { .. })));

    let deleted = projects
        .delete_subject(&admin(), "proj-1", "P001")
        .await
        .unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(store.len(EntityKind::Record).await, 1);
    assert_eq!(
        audit_actions(&store).await.last().map(String::as_str),
        Some("delete_subject")
    );
}

#[tokio::test]
async fn test_create_project() {
    let store = Arc::new(MemoryStore::new());
    let projects = ProjectService::new(store.clone(), EngineConfig::default());

    let created = projects
        .create_project(
            &editor(),
            Project::new("Heart Failure Registry")
                .with_description("Observational cohort")
                .with_investigator("Dr. Ada Osei", "City Hospital")
                .with_irb_number("IRB-2024-017"),
        )
        .await
        .unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.status, ProjectStatus::Development);
    assert_eq!(created.created_by.as_deref(), Some("user-editor"));
    assert_eq!(created.irb_number, "IRB-2024-017");
    assert_eq!(audit_actions(&store).await, vec!["create_project"]);

    let snapshot = projects.snapshot(&created.id).await.unwrap();
    assert_eq!(snapshot.project.institution, "City Hospital");

    let blank = projects.create_project(&editor(), Project::new("  ")).await;
    assert!(matches!(blank, Err(FormcapError::InvalidInput { .. })));

    let denied = projects
        .create_project(&viewer(), Project::new("Not Allowed"))
        .await;
    assert!(matches!(denied, Err(FormcapError::PermissionDenied { .. })));
    assert_eq!(store.len(EntityKind::Project).await, 1);
}

#[tokio::test]
async fn test_projects_stored_by_the_web_app_load() {
    let store = Arc::new(MemoryStore::new());
    store
        .create(
            EntityKind::Project,
            json!({
                "id": "proj-web",
                "project_name": "Sleep Study",
                "description": "",
                "principal_investigator": "Dr. Lee",
                "institution": "",
                "irb_number": "",
                "status": "development",
                "settings": {}
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
        .await
        .unwrap();

    let projects = ProjectService::new(store.clone(), EngineConfig::default());
    let snapshot = projects.snapshot("proj-web").await.unwrap();
    assert_eq!(snapshot.project.project_name, "Sleep Study");
    assert_eq!(snapshot.project.principal_investigator, "Dr. Lee");
    assert!(snapshot.project.settings.data_validation);
    assert_eq!(snapshot.visits.len(), 6);

    let legacy: Project = serde_json::from_value(json!({ "id": "p", "name": "Old" })).unwrap();
    assert_eq!(legacy.project_name, "Old");
}

/// A store whose reads always fail.
struct UnreachableStore;

#[async_trait]
impl EntityStore for UnreachableStore {
    async fn list(&self, _kind: EntityKind) -> Result<Vec<Entity>> {
        Err(FormcapError::storage("backend unreachable"))
    }
    async fn filter(&self, _kind: EntityKind, _criteria: &Criteria) -> Result<Vec<Entity>> {
        Err(FormcapError::storage("backend unreachable"))
    }
    async fn get(&self, _kind: EntityKind, _id: &str) -> Result<Option<Entity>> {
        Err(FormcapError::storage("backend unreachable"))
    }
    async fn create(&self, _kind: EntityKind, _fields: Entity) -> Result<Entity> {
        Err(FormcapError::storage("backend unreachable"))
    }
    async fn update(&self, _kind: EntityKind, _id: &str, _fields: Entity) -> Result<Entity> {
        Err(FormcapError::storage("backend unreachable"))
    }
    async fn delete(&self, _kind: EntityKind, _id: &str) -> Result<bool> {
        Err(FormcapError::storage("backend unreachable"))
    }
}

#[tokio::test]
async fn test_store_failures_surface_as_errors() {
    let projects = ProjectService::new(Arc::new(UnreachableStore), EngineConfig::default());
    let result = projects.snapshot("proj-1").await;
    assert!(matches!(result, Err(FormcapError::Storage { .. })));
}
