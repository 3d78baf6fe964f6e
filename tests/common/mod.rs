use formcap::*;
use serde_json::Value;
use std::sync::Arc;

#[allow(dead_code)]
pub fn values(json: Value) -> FieldValues {
    match json {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[allow(dead_code)]
pub fn create_test_schema() -> FormSchema {
    FormSchema::new()
        .with_field(
            FieldDefinition::text("initials", "Initials")
                .required()
                .with_validation(
                    FieldValidation::new()
                        .with_min_length(2)
                        .with_max_length(3)
                        .with_pattern("^[A-Z]+$"),
                ),
        )
        .with_field(
            FieldDefinition::number("age", "Age")
                .required()
                .with_validation(FieldValidation::new().with_min(18.0).with_max(99.0)),
        )
        .with_field(FieldDefinition::new("visit_date", "Visit Date", FieldType::Date))
        .with_field(
            FieldDefinition::new("sex", "Sex", FieldType::Radio).with_options(["Male", "Female"]),
        )
        .with_field(
            FieldDefinition::new("symptoms", "Symptoms", FieldType::Checkbox)
                .required()
                .with_options(["Fever", "Cough", "Fatigue"]),
        )
}

#[allow(dead_code)]
pub fn create_test_record(form_id: &str, subject_id: &str, status: &str) -> Record {
    Record::new("proj-1", form_id, subject_id)
        .with_id(format!("{form_id}-{subject_id}-{status}"))
        .with_status(status)
}

#[allow(dead_code)]
pub fn create_test_form(id: &str, name: &str, order_index: i64) -> Form {
    Form::new("proj-1", name, create_test_schema())
        .with_id(id)
        .with_order_index(order_index)
}

#[allow(dead_code)]
pub fn admin() -> SessionContext {
    SessionContext::new("user-admin", UserRole::Administrator)
}

#[allow(dead_code)]
pub fn editor() -> SessionContext {
    SessionContext::new("user-editor", UserRole::Editor)
}

#[allow(dead_code)]
pub fn viewer() -> SessionContext {
    SessionContext::new("user-viewer", UserRole::Viewer)
}

/// A store seeded with one project (default schedule) and two forms.
#[allow(dead_code)]
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    let project = Project::new("Cohort Study").with_id("proj-1");
    store
        .create_as(EntityKind::Project, &project)
        .await
        .expect("seed project");

    for form in [
        create_test_form("form-demo", "Demographics", 1),
        create_test_form("form-vitals", "Vitals", 2),
    ] {
        store
            .create_as(EntityKind::Form, &form)
            .await
            .expect("seed form");
    }

    store
}
