use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{FormcapError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Project,
    Form,
    Record,
    FormVisitAssignment,
    AuditLog,
    User,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Project => "Project",
            EntityKind::Form => "Form",
            EntityKind::Record => "Record",
            EntityKind::FormVisitAssignment => "FormVisitAssignment",
            EntityKind::AuditLog => "AuditLog",
            EntityKind::User => "User",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque stored object. The store owns the `id` key.
pub type Entity = serde_json::Map<String, Value>;

/// Equality criteria; an entity matches when every key is present with an
/// equal value.
pub type Criteria = BTreeMap<String, Value>;

/// Builds criteria from `(key, value)` pairs.
pub fn criteria<I, K, V>(pairs: I) -> Criteria
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// The hosted persistence service, reduced to CRUD over opaque entities.
///
/// Failures must surface as `Err`. An implementation that returns an empty
/// list on a failed fetch would make every form look `not_started`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>>;
    async fn filter(&self, kind: EntityKind, criteria: &Criteria) -> Result<Vec<Entity>>;
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>>;
    async fn create(&self, kind: EntityKind, fields: Entity) -> Result<Entity>;
    async fn update(&self, kind: EntityKind, id: &str, fields: Entity) -> Result<Entity>;
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool>;
}

pub fn to_entity<T: Serialize>(value: &T) -> Result<Entity> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(FormcapError::storage(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

pub fn from_entity<T: DeserializeOwned>(entity: Entity) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(entity))?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed helpers over any [`EntityStore`].
#[async_trait]
pub trait TypedStore: EntityStore {
    async fn filter_as<T>(&self, kind: EntityKind, criteria: &Criteria) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.filter(kind, criteria)
            .await?
            .into_iter()
            .map(from_entity::<T>)
            .collect()
    }

    async fn get_as<T>(&self, kind: EntityKind, id: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.get(kind, id).await?.map(from_entity::<T>).transpose()
    }

    async fn require_as<T>(&self, kind: EntityKind, id: &str) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.get_as(kind, id)
            .await?
            .ok_or_else(|| FormcapError::not_found(kind, id))
    }

    async fn create_as<T>(&self, kind: EntityKind, value: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let created = self.create(kind, to_entity(value)?).await?;
        from_entity(created)
    }

    async fn update_as<T>(&self, kind: EntityKind, id: &str, value: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let updated = self.update(kind, id, to_entity(value)?).await?;
        from_entity(updated)
    }
}

impl<S: EntityStore + ?Sized> TypedStore for S {}
