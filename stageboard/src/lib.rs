//! Stage-transition pipeline engine
//!
//! This crate provides the engine behind a drag-and-drop pipeline board: an ordered set of
//! stages, entities sitting in those stages, and the protocol that moves an entity from one
//! stage to another with an optimistic local update, an asynchronous persistence call and a
//! reconciliation step that either confirms or rolls back.
//!
//! ## Overview
//!
//! - **One engine, many views** - Every board view consumes [`PipelineBoard`] instead of
//!   re-implementing the optimistic update loop
//! - **Store vs overlay** - [`EntityStore`] mirrors backend truth, [`OptimisticOverlay`] is the
//!   UI-visible view that may run ahead of it while a transition is in flight
//! - **Library-agnostic gestures** - [`DragGestureController`] takes plain ids, stages and indices
//! - **Serialized per entity** - at most one authoritative transition per entity, with a
//!   configurable [`ConcurrentDragPolicy`]
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stageboard::{
//!     DragStart, DropLocation, MemoryBackend, PipelineBoard, StageboardConfig, TransitionOutcome,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(MemoryBackend::new());
//! let board = PipelineBoard::new(backend, &StageboardConfig::default())?;
//! board.load().await?;
//!
//! board.drag_start(DragStart::new("entity-1", DropLocation::new("Prospect", 0)));
//! let outcome = board.handle_drop(Some(DropLocation::new("Active", 0))).await?;
//! if let TransitionOutcome::Confirmed(transition) = outcome {
//!     println!("moved to {}", transition.to_stage);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Board Directory
//!
//! ```text
//! repo/
//! └── .stageboard/
//!     ├── stageboard.toml     # Optional configuration (also .yaml / .json)
//!     └── entities/
//!         ├── {id}.yaml       # Entity state
//!         └── {id}.jsonl      # Per-entity contact log
//! ```

pub mod backend;
mod board;
pub mod config;
pub mod coordinator;
mod error;
pub mod gesture;
pub mod notify;
pub mod overlay;
pub mod registry;
pub mod render;
pub mod store;
pub mod types;

pub use backend::{ContactLog, FileBackend, MemoryBackend, PipelineBackend, BOARD_DIR_NAME};
pub use board::PipelineBoard;
pub use config::{ConcurrentDragPolicy, StageConfig, StageboardConfig};
pub use coordinator::{TransitionCoordinator, TransitionOutcome, TransitionState};
pub use error::{Result, StageboardError};
pub use gesture::{DragGestureController, DragStart, DropLocation, GestureOutcome};
pub use notify::{
    Notification, NotificationCenter, NotificationEvent, NotificationId, NotificationKind,
    Notifier,
};
pub use overlay::OptimisticOverlay;
pub use registry::{StageMeta, StageRegistry};
pub use render::{group_by_stage, BoardColumns, StageColumn};
pub use store::EntityStore;

// Re-export commonly used types
pub use types::{Entity, EntityId, Priority, Profile, StageId, Transition, TransitionRequest};
