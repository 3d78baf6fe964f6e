use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{FormcapError, Result};
use crate::storage::{Criteria, Entity, EntityKind, EntityStore};

const ID_KEY: &str = "id";
const CREATED_KEY: &str = "created_date";
const UPDATED_KEY: &str = "updated_date";

/// In-process [`EntityStore`]. Entities of each kind are kept in creation
/// order, so `list` and `filter` return them oldest first.
#[derive(Debug)]
pub struct MemoryStore {
    entities: Arc<RwLock<HashMap<EntityKind, Vec<Entity>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self, kind: EntityKind) -> usize {
        self.entities
            .read()
            .await
            .get(&kind)
            .map_or(0, Vec::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.values().all(Vec::is_empty)
    }

    pub async fn clear(&self) {
        self.entities.write().await.clear();
    }
}

fn entity_id(entity: &Entity) -> Option<&str> {
    entity.get(ID_KEY).and_then(Value::as_str)
}

fn matches_criteria(entity: &Entity, criteria: &Criteria) -> bool {
    criteria
        .iter()
        .all(|(key, expected)| entity.get(key) == Some(expected))
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let entities = self.entities.read().await;
        Ok(entities.get(&kind).cloned().unwrap_or_default())
    }

    async fn filter(&self, kind: EntityKind, criteria: &Criteria) -> Result<Vec<Entity>> {
        let entities = self.entities.read().await;
        Ok(entities
            .get(&kind)
            .map(|all| {
                all.iter()
                    .filter(|e| matches_criteria(e, criteria))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>> {
        let entities = self.entities.read().await;
        Ok(entities
            .get(&kind)
            .and_then(|all| all.iter().find(|e| entity_id(e) == Some(id)))
            .cloned())
    }

    async fn create(&self, kind: EntityKind, mut fields: Entity) -> Result<Entity> {
        let mut entities = self.entities.write().await;
        let bucket = entities.entry(kind).or_default();

        let id = match entity_id(&fields) {
            Some(id) if !id.is_empty() => {
                if bucket.iter().any(|e| entity_id(e) == Some(id)) {
                    return Err(FormcapError::storage(format!(
                        "{kind} with id {id} already exists"
                    )));
                }
                id.to_string()
            }
            _ => Uuid::new_v4().to_string(),
        };

        fields.insert(ID_KEY.to_string(), Value::String(id.clone()));
        let timestamp = now();
        fields.insert(CREATED_KEY.to_string(), timestamp.clone());
        fields.insert(UPDATED_KEY.to_string(), timestamp);

        bucket.push(fields.clone());
        tracing::debug!("Created {} {}", kind, id);
        Ok(fields)
    }

    async fn update(&self, kind: EntityKind, id: &str, fields: Entity) -> Result<Entity> {
        let mut entities = self.entities.write().await;
        let existing = entities
            .get_mut(&kind)
            .and_then(|all| all.iter_mut().find(|e| entity_id(e) == Some(id)))
            .ok_or_else(|| FormcapError::not_found(kind, id))?;

        for (key, value) in fields {
            if key == ID_KEY || key == CREATED_KEY {
                continue;
            }
            existing.insert(key, value);
        }
        existing.insert(UPDATED_KEY.to_string(), now());

        tracing::debug!("Updated {} {}", kind, id);
        Ok(existing.clone())
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let mut entities = self.entities.write().await;
        let Some(all) = entities.get_mut(&kind) else {
            return Ok(false);
        };
        let before = all.len();
        all.retain(|e| entity_id(e) != Some(id));
        let removed = all.len() != before;
        if removed {
            tracing::debug!("Deleted {} {}", kind, id);
        }
        Ok(removed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            entities: Arc::clone(&self.entities),
        }
    }
}
