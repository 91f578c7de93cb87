//! PipelineBoard - the handle every board view consumes

use crate::backend::PipelineBackend;
use crate::config::StageboardConfig;
use crate::coordinator::{BoardState, TransitionCoordinator, TransitionOutcome};
use crate::error::Result;
use crate::gesture::{DragGestureController, DragStart, DropLocation, GestureOutcome};
use crate::notify::{NotificationCenter, NotificationEvent};
use crate::overlay::OptimisticOverlay;
use crate::registry::StageRegistry;
use crate::render::{group_by_stage, BoardColumns};
use crate::store::EntityStore;
use crate::types::{Entity, EntityId, StageId, TransitionRequest};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// A pipeline board: registry, confirmed store, optimistic overlay, gestures and transitions.
///
/// Cloning is cheap and every clone drives the same board, so a transition can be spawned
/// onto a task while the view keeps rendering.
#[derive(Clone)]
pub struct PipelineBoard {
    inner: Arc<BoardInner>,
}

struct BoardInner {
    registry: Arc<StageRegistry>,
    state: Arc<RwLock<BoardState>>,
    gesture: Mutex<DragGestureController>,
    coordinator: TransitionCoordinator,
    notifications: Arc<NotificationCenter>,
}

impl PipelineBoard {
    /// Create a board over a backend. Nothing is fetched until [`PipelineBoard::load`].
    pub fn new(backend: Arc<dyn PipelineBackend>, config: &StageboardConfig) -> Result<Self> {
        let registry = Arc::new(config.registry()?);
        let notifications = Arc::new(NotificationCenter::new(config.notification_capacity));
        let state = Arc::new(RwLock::new(BoardState::default()));
        let coordinator = TransitionCoordinator::new(
            registry.clone(),
            backend,
            notifications.clone(),
            state.clone(),
            config,
        );

        Ok(Self {
            inner: Arc::new(BoardInner {
                registry,
                state,
                gesture: Mutex::new(DragGestureController::new()),
                coordinator,
                notifications,
            }),
        })
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.inner.registry
    }

    pub fn coordinator(&self) -> &TransitionCoordinator {
        &self.inner.coordinator
    }

    pub fn notification_center(&self) -> &NotificationCenter {
        &self.inner.notifications
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.notifications.subscribe()
    }

    /// Hydrate the store and overlay from the backend
    pub async fn load(&self) -> Result<usize> {
        let count = self.inner.coordinator.refresh().await?.unwrap_or(0);
        info!(entities = count, "board loaded");
        Ok(count)
    }

    /// Refetch from the backend; in-flight optimistic stages stay visible on top
    pub async fn refresh(&self) -> Result<usize> {
        Ok(self.inner.coordinator.refresh().await?.unwrap_or(0))
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Columns as the user should see them (overlay)
    pub async fn columns(&self) -> BoardColumns {
        let state = self.inner.state.read().await;
        group_by_stage(state.overlay.entities(), &self.inner.registry)
    }

    /// One entity as currently shown
    pub async fn entity(&self, id: &EntityId) -> Option<Entity> {
        self.inner.state.read().await.overlay.get(id).cloned()
    }

    /// Copy of the UI-visible overlay
    pub async fn overlay(&self) -> OptimisticOverlay {
        self.inner.state.read().await.overlay.clone()
    }

    /// Copy of the confirmed store
    pub async fn store(&self) -> EntityStore {
        self.inner.state.read().await.store.clone()
    }

    /// Stages an entity can be moved to from the menu
    pub async fn available_stages(&self, id: &EntityId) -> Option<Vec<StageId>> {
        let entity = self.entity(id).await?;
        Some(self.inner.registry.next_available_stages(&entity.stage))
    }

    // =========================================================================
    // Gestures and transitions
    // =========================================================================

    pub fn drag_start(&self, start: DragStart) {
        self.gesture().on_drag_start(start);
    }

    pub fn drag_cancel(&self) {
        self.gesture().on_drag_cancel();
    }

    /// Finish the active drag and run the resulting transition, if any
    pub async fn handle_drop(&self, destination: Option<DropLocation>) -> Result<TransitionOutcome> {
        let outcome = self.gesture().on_drop(destination);
        match outcome {
            GestureOutcome::Transition(request) => self.inner.coordinator.request(request).await,
            GestureOutcome::Cancelled | GestureOutcome::NoOp | GestureOutcome::Reordered { .. } => {
                Ok(TransitionOutcome::Ignored)
            }
        }
    }

    /// Move an entity without a drag, as the card menu does
    pub async fn move_entity(&self, id: &EntityId, stage: &StageId) -> Result<TransitionOutcome> {
        let Some(current) = self.entity(id).await else {
            return self
                .inner
                .coordinator
                .request(TransitionRequest::new(id, stage, stage))
                .await;
        };
        self.inner
            .coordinator
            .request(TransitionRequest::new(id, current.stage, stage))
            .await
    }

    /// Detach the board from its view.
    ///
    /// In-flight backend calls still run to completion, but their settlements no longer touch
    /// the store, the overlay or the notifications.
    pub async fn teardown(&self) {
        self.gesture().on_drag_cancel();
        let abandoned = self.inner.coordinator.teardown().await;
        debug!(abandoned, "board torn down");
    }

    fn gesture(&self) -> MutexGuard<'_, DragGestureController> {
        self.inner
            .gesture
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::notify::NotificationKind;

    async fn board() -> (Arc<MemoryBackend>, PipelineBoard) {
        let backend = Arc::new(MemoryBackend::with_entities(vec![
            Entity::new("Acme", "Prospect").with_id("acme"),
            Entity::new("Initech", "Prospect").with_id("initech"),
        ]));
        let board = PipelineBoard::new(backend.clone(), &StageboardConfig::default()).unwrap();
        board.load().await.unwrap();
        (backend, board)
    }

    #[tokio::test]
    async fn test_load_populates_columns() {
        let (backend, board) = board().await;
        let columns = board.columns().await;
        assert_eq!(columns.column(&"Prospect".into()).unwrap().entities.len(), 2);
        assert_eq!(columns.total(), 2);
        assert_eq!(backend.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_on_other_column_confirms() {
        let (backend, board) = board().await;
        board.drag_start(DragStart::new("acme", DropLocation::new("Prospect", 0)));
        let outcome = board
            .handle_drop(Some(DropLocation::new("Negotiation", 0)))
            .await
            .unwrap();

        assert!(outcome.is_confirmed());
        assert_eq!(
            backend.get(&"acme".into()).await.unwrap().stage.as_str(),
            "Negotiation"
        );
        assert_eq!(
            board.entity(&"acme".into()).await.unwrap().stage.as_str(),
            "Negotiation"
        );
    }

    #[tokio::test]
    async fn test_reorder_and_cancel_are_ignored() {
        let (backend, board) = board().await;

        board.drag_start(DragStart::new("acme", DropLocation::new("Prospect", 0)));
        let reorder = board
            .handle_drop(Some(DropLocation::new("Prospect", 1)))
            .await
            .unwrap();
        assert_eq!(reorder, TransitionOutcome::Ignored);

        board.drag_start(DragStart::new("acme", DropLocation::new("Prospect", 0)));
        board.drag_cancel();
        let after_cancel = board
            .handle_drop(Some(DropLocation::new("Active", 0)))
            .await
            .unwrap();
        assert_eq!(after_cancel, TransitionOutcome::Ignored);

        assert_eq!(backend.update_count(), 0);
        assert!(board.notification_center().visible().is_empty());
    }

    #[tokio::test]
    async fn test_move_entity_without_gesture() {
        let (_backend, board) = board().await;
        let outcome = board
            .move_entity(&"initech".into(), &"Active".into())
            .await
            .unwrap();
        assert!(outcome.is_confirmed());

        let visible = board.notification_center().visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].kind, NotificationKind::Success);
    }

    #[tokio::test]
    async fn test_move_unknown_entity_is_unresolved() {
        let (backend, board) = board().await;
        let outcome = board
            .move_entity(&"ghost".into(), &"Active".into())
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Unresolved("ghost".into()));
        assert_eq!(backend.update_count(), 0);
    }

    #[tokio::test]
    async fn test_available_stages_excludes_current() {
        let (_backend, board) = board().await;
        let stages = board.available_stages(&"acme".into()).await.unwrap();
        assert_eq!(stages.len(), 5);
        assert!(!stages.contains(&"Prospect".into()));
        assert!(board.available_stages(&"ghost".into()).await.is_none());
    }

    #[tokio::test]
    async fn test_teardown_clears_active_drag() {
        let (backend, board) = board().await;
        board.drag_start(DragStart::new("acme", DropLocation::new("Prospect", 0)));
        board.teardown().await;

        let outcome = board
            .handle_drop(Some(DropLocation::new("Active", 0)))
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Ignored);
        assert_eq!(backend.update_count(), 0);
    }
}
