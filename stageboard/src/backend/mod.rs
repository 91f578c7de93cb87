//! Persistence backends
//!
//! The engine only ever talks to a backend through [`PipelineBackend`]: a full fetch and a
//! single-field stage update. Anything else a backend offers is outside the engine.

mod file;
mod memory;

pub use file::{ContactLog, FileBackend, BOARD_DIR_NAME};
pub use memory::MemoryBackend;

use crate::error::Result;
use crate::types::{Entity, EntityId, StageId};
use async_trait::async_trait;

/// The authoritative store behind a board
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    /// Fetch every entity. Stages in the result are authoritative, including ones the
    /// client never asked for.
    async fn fetch_entities(&self) -> Result<Vec<Entity>>;

    /// Persist a stage change.
    ///
    /// `Ok(false)` means the backend refused the change without raising an error. Calling
    /// this twice with the same arguments must leave the same state as calling it once.
    async fn update_stage(&self, id: &EntityId, stage: &StageId) -> Result<bool>;
}
