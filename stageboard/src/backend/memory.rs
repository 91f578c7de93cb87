//! In-process backend

use super::PipelineBackend;
use crate::error::Result;
use crate::types::{Entity, EntityId, StageId};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Backend keeping entities in memory, with call counters
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entities: RwLock<Vec<Entity>>,
    fetches: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: Vec<Entity>) -> Self {
        Self {
            entities: RwLock::new(entities),
            ..Self::default()
        }
    }

    pub async fn insert(&self, entity: Entity) {
        self.entities.write().await.push(entity);
    }

    /// Change a stage on the "server side", as a database trigger would
    pub async fn set_stage(&self, id: &EntityId, stage: &StageId) -> bool {
        let mut entities = self.entities.write().await;
        match entities.iter_mut().find(|e| &e.id == id) {
            Some(entity) => {
                entity.stage = stage.clone();
                entity.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: &EntityId) -> Option<Entity> {
        self.entities
            .read()
            .await
            .iter()
            .find(|e| &e.id == id)
            .cloned()
    }

    /// Number of `fetch_entities` calls served
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of `update_stage` calls served
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineBackend for MemoryBackend {
    async fn fetch_entities(&self) -> Result<Vec<Entity>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.entities.read().await.clone())
    }

    async fn update_stage(&self, id: &EntityId, stage: &StageId) -> Result<bool> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(self.set_stage(id, stage).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_stage_is_idempotent() {
        let backend = MemoryBackend::with_entities(vec![Entity::new("Acme", "Prospect").with_id("a")]);
        let id = EntityId::from("a");
        let active = StageId::from("Active");

        assert!(backend.update_stage(&id, &active).await.unwrap());
        assert!(backend.update_stage(&id, &active).await.unwrap());

        let entities = backend.fetch_entities().await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].stage, active);
        assert_eq!(backend.update_count(), 2);
        assert_eq!(backend.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_entity_reports_failure() {
        let backend = MemoryBackend::new();
        let ok = backend
            .update_stage(&"ghost".into(), &"Active".into())
            .await
            .unwrap();
        assert!(!ok);
    }
}
