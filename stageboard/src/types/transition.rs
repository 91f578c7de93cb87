//! Transition types: the request a drop produces and the in-flight record it becomes

use super::ids::{EntityId, StageId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A request to move one entity to another stage, as emitted by the gesture layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRequest {
    pub entity_id: EntityId,
    pub from_stage: StageId,
    pub to_stage: StageId,
}

impl TransitionRequest {
    /// Create a new transition request
    pub fn new(
        entity_id: impl Into<EntityId>,
        from_stage: impl Into<StageId>,
        to_stage: impl Into<StageId>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            from_stage: from_stage.into(),
            to_stage: to_stage.into(),
        }
    }
}

/// An issued stage change. Never persisted; lives for one backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub entity_id: EntityId,
    pub from_stage: StageId,
    pub to_stage: StageId,
    pub requested_at: DateTime<Utc>,
    /// Monotonic sequence number, used to detect supersession
    pub ticket: u64,
    /// Board generation the transition was issued under
    pub generation: u64,
}
