//! Core types for the pipeline engine

mod entity;
mod ids;
mod transition;

// Re-export all types
pub use entity::{Entity, Priority, Profile};
pub use ids::{EntityId, StageId};
pub use transition::{Transition, TransitionRequest};
