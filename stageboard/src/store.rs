//! EntityStore - in-memory mirror of backend truth
//!
//! Holds the last-known-confirmed snapshot exactly as the backend delivered it. There is no
//! merge logic: a refetch replaces everything, last write wins.

use crate::types::{Entity, EntityId, StageId};
use std::collections::HashMap;
use std::sync::Arc;

/// Confirmed entity snapshot, keyed by id
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Arc<[Entity]>,
    index: HashMap<EntityId, usize>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replace on fetch/refetch.
    ///
    /// If the backend hands back the same id twice, lookups resolve to the later record.
    pub fn replace_all(&mut self, entities: Vec<Entity>) {
        self.index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        self.entities = entities.into();
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    /// Shared handle to the current snapshot, in backend order
    pub fn snapshot(&self) -> Arc<[Entity]> {
        Arc::clone(&self.entities)
    }

    /// Record a stage the backend has confirmed without waiting for a refetch.
    ///
    /// Returns `false` when the id is not in the snapshot.
    pub fn confirm_stage(&mut self, id: &EntityId, stage: &StageId) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        if &self.entities[i].stage == stage {
            return true;
        }

        let mut entities = self.entities.to_vec();
        entities[i].stage = stage.clone();
        self.entities = entities.into();
        true
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
