//! OptimisticOverlay - the UI-visible entity list
//!
//! The overlay may run ahead of the [`EntityStore`] while transitions are in flight. Every
//! mutation produces a new overlay and leaves the previous one untouched, so a rollback can
//! always fall back to a known list.

use crate::store::EntityStore;
use crate::types::{Entity, EntityId, StageId};
use std::sync::Arc;
use tracing::trace;

/// Store snapshot plus the stage changes of in-flight transitions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimisticOverlay {
    entities: Arc<[Entity]>,
}

impl OptimisticOverlay {
    /// Overlay showing exactly the store's confirmed state
    pub fn from_store(store: &EntityStore) -> Self {
        Self {
            entities: store.snapshot(),
        }
    }

    /// New overlay with one entity's stage replaced.
    ///
    /// Returns `None` when the entity is not part of the overlay.
    pub fn apply_optimistic(&self, id: &EntityId, new_stage: &StageId) -> Option<Self> {
        let position = self.entities.iter().position(|e| &e.id == id)?;
        trace!(entity = %id, stage = %new_stage, "applying optimistic stage");

        let entities: Vec<Entity> = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| {
                if i == position {
                    e.in_stage(new_stage)
                } else {
                    e.clone()
                }
            })
            .collect();

        Some(Self {
            entities: entities.into(),
        })
    }

    /// Throw away every optimistic change and show the store again
    pub fn discard_and_resync(&mut self, store: &EntityStore) {
        trace!(entities = store.len(), "resyncing overlay from store");
        self.entities = store.snapshot();
    }

    /// Rebuild from the store, re-applying the stages of transitions still in flight.
    ///
    /// Pending changes for entities that vanished from the store are dropped.
    pub fn rebase<'a, I>(&mut self, store: &EntityStore, pending: I)
    where
        I: IntoIterator<Item = (&'a EntityId, &'a StageId)>,
    {
        let mut next = Self::from_store(store);
        for (id, stage) in pending {
            if let Some(applied) = next.apply_optimistic(id, stage) {
                next = applied;
            }
        }
        *self = next;
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// True when the overlay shows exactly the store's snapshot
    pub fn matches_store(&self, store: &EntityStore) -> bool {
        self.entities[..] == store.snapshot()[..]
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
