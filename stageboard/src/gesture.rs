//! DragGestureController - turns drag-start / drop events into transition requests
//!
//! The controller knows nothing about any particular drag-and-drop library. Callers feed it
//! plain data: the dragged entity id and `(stage, index)` locations.

use crate::types::{EntityId, StageId, TransitionRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A slot on the board: a stage column and an index inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropLocation {
    pub stage: StageId,
    pub index: usize,
}

impl DropLocation {
    pub fn new(stage: impl Into<StageId>, index: usize) -> Self {
        Self {
            stage: stage.into(),
            index,
        }
    }
}

/// The start of a drag: which entity, picked up from where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragStart {
    pub entity_id: EntityId,
    pub source: DropLocation,
}

impl DragStart {
    pub fn new(entity_id: impl Into<EntityId>, source: DropLocation) -> Self {
        Self {
            entity_id: entity_id.into(),
            source,
        }
    }
}

/// What a drop amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Dropped outside any valid zone, or no drag was active
    Cancelled,
    /// Dropped back where it was picked up
    NoOp,
    /// Moved within the same column. Accepted, but there is no persisted ordering.
    Reordered {
        stage: StageId,
        from_index: usize,
        to_index: usize,
    },
    /// Moved to a different stage
    Transition(TransitionRequest),
}

/// Tracks the active drag and classifies drops
#[derive(Debug, Default)]
pub struct DragGestureController {
    active: Option<DragStart>,
}

impl DragGestureController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a drag, replacing any drag that never finished
    pub fn on_drag_start(&mut self, start: DragStart) {
        debug!(
            entity = %start.entity_id,
            stage = %start.source.stage,
            index = start.source.index,
            "drag started"
        );
        self.active = Some(start);
    }

    /// Abandon the active drag
    pub fn on_drag_cancel(&mut self) {
        self.active = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&DragStart> {
        self.active.as_ref()
    }

    /// Finish the active drag. `None` means the card was released outside every column.
    pub fn on_drop(&mut self, destination: Option<DropLocation>) -> GestureOutcome {
        let Some(start) = self.active.take() else {
            debug!("drop without an active drag");
            return GestureOutcome::Cancelled;
        };
        let outcome = Self::classify(&start, destination);
        debug!(entity = %start.entity_id, ?outcome, "drop classified");
        outcome
    }

    /// Classify a completed gesture without touching controller state
    pub fn classify(start: &DragStart, destination: Option<DropLocation>) -> GestureOutcome {
        let Some(destination) = destination else {
            return GestureOutcome::Cancelled;
        };

        if destination.stage == start.source.stage {
            if destination.index == start.source.index {
                return GestureOutcome::NoOp;
            }
            return GestureOutcome::Reordered {
                stage: destination.stage,
                from_index: start.source.index,
                to_index: destination.index,
            };
        }

        GestureOutcome::Transition(TransitionRequest {
            entity_id: start.entity_id.clone(),
            from_stage: start.source.stage.clone(),
            to_stage: destination.stage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DragStart {
        DragStart::new("e1", DropLocation::new("Prospect", 2))
    }

    #[test]
    fn test_same_stage_same_index_is_noop() {
        let mut controller = DragGestureController::new();
        controller.on_drag_start(start());
        assert_eq!(
            controller.on_drop(Some(DropLocation::new("Prospect", 2))),
            GestureOutcome::NoOp
        );
        assert!(!controller.is_dragging());
    }

    #[test]
    fn test_dropped_outside() {
        let mut controller = DragGestureController::new();
        controller.on_drag_start(start());
        assert_eq!(controller.on_drop(None), GestureOutcome::Cancelled);
    }

    #[test]
    fn test_reorder_within_column() {
        let outcome = DragGestureController::classify(&start(), Some(DropLocation::new("Prospect", 0)));
        assert_eq!(
            outcome,
            GestureOutcome::Reordered {
                stage: "Prospect".into(),
                from_index: 2,
                to_index: 0,
            }
        );
    }

    #[test]
    fn test_cross_stage_emits_transition() {
        let outcome = DragGestureController::classify(&start(), Some(DropLocation::new("Active", 2)));
        assert_eq!(
            outcome,
            GestureOutcome::Transition(TransitionRequest::new("e1", "Prospect", "Active"))
        );
    }

    #[test]
    fn test_drop_without_start() {
        let mut controller = DragGestureController::new();
        assert_eq!(
            controller.on_drop(Some(DropLocation::new("Active", 0))),
            GestureOutcome::Cancelled
        );
    }

    #[test]
    fn test_cancel_clears_active_drag() {
        let mut controller = DragGestureController::new();
        controller.on_drag_start(start());
        assert_eq!(controller.active().unwrap().entity_id.as_str(), "e1");
        controller.on_drag_cancel();
        assert!(controller.active().is_none());
        assert_eq!(
            controller.on_drop(Some(DropLocation::new("Active", 0))),
            GestureOutcome::Cancelled
        );
    }
}
