//! TransitionCoordinator - drives one stage change from drop to reconciliation
//!
//! Every transition walks `Idle → Optimistic → (Confirmed | RolledBack)`:
//!
//! 1. The overlay is updated immediately and a loading toast is shown.
//! 2. The backend is asked to persist the change. This is the only await between the
//!    optimistic update and the settlement; the board lock is not held across it.
//! 3. On success the store records the new stage, a success toast replaces the loading one
//!    and the store is refetched so server-side side effects become visible.
//! 4. On failure an error toast replaces the loading one and the overlay is rebuilt from the
//!    store. The old stage is re-derived from the store, never restored by value.
//!
//! Two guards keep settlements honest. A per-entity in-flight table means only one
//! transition per entity is authoritative at a time, and a generation counter bumped on
//! teardown makes settlements from a torn-down board no-ops.

use crate::backend::PipelineBackend;
use crate::config::{ConcurrentDragPolicy, StageboardConfig};
use crate::error::{Result, StageboardError};
use crate::notify::{NotificationId, Notifier};
use crate::overlay::OptimisticOverlay;
use crate::registry::StageRegistry;
use crate::store::EntityStore;
use crate::types::{Entity, EntityId, StageId, Transition, TransitionRequest};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Where an entity currently is in the transition state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionState {
    /// Nothing in flight
    Idle,
    /// Optimistically shown in `to_stage`, waiting for the backend
    Optimistic { to_stage: StageId, ticket: u64 },
}

/// How a transition request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The backend accepted the change
    Confirmed(Transition),
    /// The backend refused or failed; the overlay was resynced from the store
    RolledBack { transition: Transition, reason: String },
    /// Another transition of the same entity was in flight
    Rejected { entity_id: EntityId, pending_stage: StageId },
    /// A newer transition of the same entity took over before this one settled
    Superseded(Transition),
    /// The board was torn down before this transition settled
    Stale(Transition),
    /// The dragged id is not on the board; nothing happened
    Unresolved(EntityId),
    /// Nothing to do: same stage, reorder, or a drop outside every column
    Ignored,
}

impl TransitionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack { .. })
    }
}

#[derive(Debug, Clone)]
struct PendingTransition {
    ticket: u64,
    to_stage: StageId,
    loading: NotificationId,
    /// A superseded transition of the same entity was persisted while this one was pending
    store_behind: bool,
}

/// Mutable board state shared between the coordinator and the board handle
#[derive(Debug, Default)]
pub(crate) struct BoardState {
    pub(crate) store: EntityStore,
    pub(crate) overlay: OptimisticOverlay,
    in_flight: HashMap<EntityId, PendingTransition>,
    pub(crate) generation: u64,
    next_ticket: u64,
}

impl BoardState {
    /// Replace the store and rebuild the overlay on top of it
    fn replace_all(&mut self, entities: Vec<Entity>) {
        self.store.replace_all(entities);
        self.resync_overlay();
    }

    /// Overlay = store + stages of transitions still in flight
    fn resync_overlay(&mut self) {
        let Self {
            store,
            overlay,
            in_flight,
            ..
        } = self;

        if in_flight.is_empty() {
            overlay.discard_and_resync(store);
        } else {
            overlay.rebase(store, in_flight.iter().map(|(id, p)| (id, &p.to_stage)));
        }
    }

    /// Forget every in-flight transition and start a new generation.
    ///
    /// Returns the loading notifications of the abandoned transitions.
    fn teardown(&mut self) -> Vec<NotificationId> {
        let loading = self.in_flight.drain().map(|(_, p)| p.loading).collect();
        self.generation += 1;
        self.resync_overlay();
        loading
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}

/// Orchestrates stage changes against a backend
#[derive(Clone)]
pub struct TransitionCoordinator {
    registry: Arc<StageRegistry>,
    backend: Arc<dyn PipelineBackend>,
    notifier: Arc<dyn Notifier>,
    state: Arc<RwLock<BoardState>>,
    policy: ConcurrentDragPolicy,
    refresh_delay: Duration,
    refresh_on_failure: bool,
}

impl TransitionCoordinator {
    pub(crate) fn new(
        registry: Arc<StageRegistry>,
        backend: Arc<dyn PipelineBackend>,
        notifier: Arc<dyn Notifier>,
        state: Arc<RwLock<BoardState>>,
        config: &StageboardConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            notifier,
            state,
            policy: config.concurrent_drags,
            refresh_delay: config.refresh_delay(),
            refresh_on_failure: config.refresh_on_failure,
        }
    }

    pub fn policy(&self) -> ConcurrentDragPolicy {
        self.policy
    }

    /// Current state machine position of an entity
    pub async fn state_of(&self, id: &EntityId) -> TransitionState {
        match self.state.read().await.in_flight.get(id) {
            Some(pending) => TransitionState::Optimistic {
                to_stage: pending.to_stage.clone(),
                ticket: pending.ticket,
            },
            None => TransitionState::Idle,
        }
    }

    /// Number of transitions awaiting their backend call
    pub async fn in_flight(&self) -> usize {
        self.state.read().await.in_flight.len()
    }

    /// Abandon every in-flight transition and dismiss its loading notification.
    ///
    /// Returns the number of transitions abandoned.
    pub async fn teardown(&self) -> usize {
        let loading = self.state.write().await.teardown();
        for id in &loading {
            self.notifier.dismiss(*id);
        }
        loading.len()
    }

    /// Fetch from the backend and replace the store.
    ///
    /// Returns the number of entities loaded, or `None` when the board was torn down while
    /// the fetch was running and the result was discarded.
    pub async fn refresh(&self) -> Result<Option<usize>> {
        let generation = self.state.read().await.generation;
        self.refresh_for(generation).await
    }

    async fn refresh_for(&self, generation: u64) -> Result<Option<usize>> {
        let entities = self.backend.fetch_entities().await?;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!("discarding refresh from a torn-down board");
            return Ok(None);
        }

        let count = entities.len();
        state.replace_all(entities);
        debug!(entities = count, "store refreshed");
        Ok(Some(count))
    }

    /// Run one transition to completion.
    ///
    /// Persistence failures are not errors: they come back as
    /// [`TransitionOutcome::RolledBack`]. The only error is a target stage outside the
    /// registry.
    pub async fn request(&self, request: TransitionRequest) -> Result<TransitionOutcome> {
        if !self.registry.contains(&request.to_stage) {
            return Err(StageboardError::unknown_stage(request.to_stage.as_str()));
        }

        let (transition, name) = match self.begin(request).await {
            Ok(started) => started,
            Err(outcome) => return Ok(outcome),
        };

        let result = self
            .backend
            .update_stage(&transition.entity_id, &transition.to_stage)
            .await;

        self.settle(transition, name, result).await
    }

    /// Idle → Optimistic. `Err` carries the outcome of a request that never left Idle.
    async fn begin(
        &self,
        request: TransitionRequest,
    ) -> std::result::Result<(Transition, String), TransitionOutcome> {
        let mut state = self.state.write().await;

        let Some(entity) = state.overlay.get(&request.entity_id).cloned() else {
            warn!(entity = %request.entity_id, "dragged entity not found on the board, ignoring drop");
            return Err(TransitionOutcome::Unresolved(request.entity_id));
        };
        if entity.stage == request.to_stage {
            debug!(entity = %entity.id, stage = %entity.stage, "already in target stage");
            return Err(TransitionOutcome::Ignored);
        }

        if let Some(pending) = state.in_flight.get(&entity.id) {
            match self.policy {
                ConcurrentDragPolicy::Reject => {
                    warn!(
                        entity = %entity.id,
                        pending = %pending.to_stage,
                        requested = %request.to_stage,
                        "transition already in flight, rejecting drag"
                    );
                    return Err(TransitionOutcome::Rejected {
                        entity_id: entity.id,
                        pending_stage: pending.to_stage.clone(),
                    });
                }
                ConcurrentDragPolicy::Supersede => {
                    debug!(
                        entity = %entity.id,
                        superseded = pending.ticket,
                        "superseding in-flight transition"
                    );
                    self.notifier.dismiss(pending.loading);
                }
            }
        }

        if entity.stage != request.from_stage {
            debug!(
                entity = %entity.id,
                gesture_stage = %request.from_stage,
                board_stage = %entity.stage,
                "gesture source differs from board state, using board state"
            );
        }

        let Some(next) = state.overlay.apply_optimistic(&entity.id, &request.to_stage) else {
            return Err(TransitionOutcome::Unresolved(entity.id));
        };
        state.overlay = next;

        let transition = Transition {
            entity_id: entity.id.clone(),
            from_stage: entity.stage.clone(),
            to_stage: request.to_stage,
            requested_at: Utc::now(),
            ticket: state.issue_ticket(),
            generation: state.generation,
        };

        let loading = self.notifier.loading(format!(
            "Moving {} to {}...",
            entity.name,
            self.registry.label(&transition.to_stage)
        ));
        state.in_flight.insert(
            entity.id.clone(),
            PendingTransition {
                ticket: transition.ticket,
                to_stage: transition.to_stage.clone(),
                loading,
                store_behind: false,
            },
        );

        debug!(
            entity = %transition.entity_id,
            from = %transition.from_stage,
            to = %transition.to_stage,
            ticket = transition.ticket,
            "optimistic transition applied"
        );
        Ok((transition, entity.name))
    }

    /// Optimistic → Confirmed | RolledBack
    async fn settle(
        &self,
        transition: Transition,
        name: String,
        result: Result<bool>,
    ) -> Result<TransitionOutcome> {
        let stage_label = self.registry.label(&transition.to_stage).to_string();
        let mut state = self.state.write().await;

        if state.generation != transition.generation {
            debug!(
                entity = %transition.entity_id,
                ticket = transition.ticket,
                "ignoring settlement from a torn-down board"
            );
            return Ok(TransitionOutcome::Stale(transition));
        }

        let current = state.in_flight.get(&transition.entity_id).map(|p| p.ticket);
        if current != Some(transition.ticket) {
            let persisted = matches!(result, Ok(true));
            debug!(
                entity = %transition.entity_id,
                ticket = transition.ticket,
                persisted,
                "superseded transition settled"
            );

            // The newer transition owns reconciliation. A late write may still have changed
            // the backend, so the store learns about it from a refetch, never by value.
            if let Some(newer) = state.in_flight.get_mut(&transition.entity_id) {
                newer.store_behind |= persisted;
            } else if persisted {
                drop(state);
                if let Err(e) = self.refresh_for(transition.generation).await {
                    warn!(error = %e, "refresh after superseded transition failed");
                }
            }
            return Ok(TransitionOutcome::Superseded(transition));
        }

        let pending = state.in_flight.remove(&transition.entity_id);
        if let Some(pending) = &pending {
            self.notifier.dismiss(pending.loading);
        }
        let store_behind = pending.as_ref().is_some_and(|p| p.store_behind);

        let reason = match result {
            Ok(true) => {
                state
                    .store
                    .confirm_stage(&transition.entity_id, &transition.to_stage);
                self.notifier
                    .success(format!("Moved {} to {} stage", name, stage_label));
                drop(state);

                info!(
                    entity = %transition.entity_id,
                    from = %transition.from_stage,
                    to = %transition.to_stage,
                    "transition confirmed"
                );
                self.refresh_after_confirm(transition.generation).await;
                return Ok(TransitionOutcome::Confirmed(transition));
            }
            Ok(false) => "backend reported failure".to_string(),
            Err(e) => e.to_string(),
        };

        self.notifier
            .error(format!("Failed to move {} to {}", name, stage_label));
        state.resync_overlay();
        drop(state);

        warn!(
            entity = %transition.entity_id,
            to = %transition.to_stage,
            %reason,
            "transition rolled back"
        );

        if self.refresh_on_failure || store_behind {
            if let Err(e) = self.refresh_for(transition.generation).await {
                warn!(error = %e, "refresh after rollback failed");
            }
        }

        Ok(TransitionOutcome::RolledBack { transition, reason })
    }

    async fn refresh_after_confirm(&self, generation: u64) {
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }

        match self.refresh_for(generation).await {
            Ok(_) => {}
            Err(e) => {
                // The confirmed stage is already in the store; the overlay just misses
                // side effects until the next refresh.
                warn!(error = %e, "refresh after confirmed transition failed");
                let mut state = self.state.write().await;
                if state.generation == generation {
                    state.resync_overlay();
                }
            }
        }
    }
}
