//! Column projection for board views

use crate::registry::{StageMeta, StageRegistry};
use crate::types::{Entity, StageId};
use serde::Serialize;
use std::collections::HashMap;

/// One stage column and the entities in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageColumn {
    pub stage: StageMeta,
    pub entities: Vec<Entity>,
}

/// Every registry stage as a column, in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumns {
    pub columns: Vec<StageColumn>,
    /// Entities whose stage is not in the registry
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unassigned: Vec<Entity>,
}

impl BoardColumns {
    pub fn column(&self, stage: &StageId) -> Option<&StageColumn> {
        self.columns.iter().find(|c| &c.stage.id == stage)
    }

    /// Entity count per stage, in display order
    pub fn counts(&self) -> Vec<(StageId, usize)> {
        self.columns
            .iter()
            .map(|c| (c.stage.id.clone(), c.entities.len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.entities.len()).sum::<usize>() + self.unassigned.len()
    }
}

/// Group entities by stage, keeping their relative input order inside each column
pub fn group_by_stage(entities: &[Entity], registry: &StageRegistry) -> BoardColumns {
    let mut columns: Vec<StageColumn> = registry
        .stages()
        .iter()
        .map(|stage| StageColumn {
            stage: stage.clone(),
            entities: Vec::new(),
        })
        .collect();
    let slots: HashMap<&StageId, usize> = registry
        .stage_ids()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();

    let mut unassigned = Vec::new();
    for entity in entities {
        match slots.get(&entity.stage) {
            Some(&i) => columns[i].entities.push(entity.clone()),
            None => unassigned.push(entity.clone()),
        }
    }

    BoardColumns {
        columns,
        unassigned,
    }
}
