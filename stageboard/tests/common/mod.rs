//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use stageboard::{
    Entity, EntityId, MemoryBackend, PipelineBackend, Result, StageId, StageboardError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{Notify, Semaphore};

/// How the scripted backend answers the next `update_stage` call
#[derive(Debug, Clone)]
pub enum Reply {
    Accept,
    /// Persist the change, then hold the acknowledgement until [`ScriptedBackend::release_ack`]
    AcceptLate,
    Refuse,
    Fail(&'static str),
}

/// Backend whose stage updates block until the test releases them
pub struct ScriptedBackend {
    inner: MemoryBackend,
    gate: Semaphore,
    replies: Mutex<VecDeque<Reply>>,
    started: Notify,
    ack_gate: Semaphore,
    applied: Notify,
    fetch_failures: AtomicUsize,
}

impl ScriptedBackend {
    /// Every update waits for [`ScriptedBackend::release`]
    pub fn gated(entities: Vec<Entity>) -> Self {
        Self::with_permits(entities, 0)
    }

    /// Updates run immediately, answering with queued replies (default: accept)
    pub fn open(entities: Vec<Entity>) -> Self {
        Self::with_permits(entities, Semaphore::MAX_PERMITS)
    }

    fn with_permits(entities: Vec<Entity>, permits: usize) -> Self {
        Self {
            inner: MemoryBackend::with_entities(entities),
            gate: Semaphore::new(permits),
            replies: Mutex::new(VecDeque::new()),
            started: Notify::new(),
            ack_gate: Semaphore::new(0),
            applied: Notify::new(),
            fetch_failures: AtomicUsize::new(0),
        }
    }

    /// Queue a reply without opening the gate
    pub fn script(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Let one waiting update through with the given reply
    pub fn release(&self, reply: Reply) {
        self.script(reply);
        self.gate.add_permits(1);
    }

    /// Wait until an update call has reached the backend
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Wait until an `AcceptLate` update has been persisted
    pub async fn wait_applied(&self) {
        self.applied.notified().await;
    }

    /// Let one held `AcceptLate` acknowledgement return
    pub fn release_ack(&self) {
        self.ack_gate.add_permits(1);
    }

    /// Make the next `n` fetches fail
    pub fn fail_fetches(&self, n: usize) {
        self.fetch_failures.store(n, Ordering::SeqCst);
    }

    pub fn memory(&self) -> &MemoryBackend {
        &self.inner
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetch_count()
    }

    pub fn update_count(&self) -> usize {
        self.inner.update_count()
    }
}

#[async_trait]
impl PipelineBackend for ScriptedBackend {
    async fn fetch_entities(&self) -> Result<Vec<Entity>> {
        let failing = self
            .fetch_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StageboardError::backend("fetch timed out"));
        }
        self.inner.fetch_entities().await
    }

    async fn update_stage(&self, id: &EntityId, stage: &StageId) -> Result<bool> {
        self.started.notify_one();
        self.gate
            .acquire()
            .await
            .expect("gate closed")
            .forget();

        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Accept);
        match reply {
            Reply::Accept => self.inner.update_stage(id, stage).await,
            Reply::AcceptLate => {
                let persisted = self.inner.update_stage(id, stage).await;
                self.applied.notify_one();
                self.ack_gate
                    .acquire()
                    .await
                    .expect("ack gate closed")
                    .forget();
                persisted
            }
            Reply::Refuse => Ok(false),
            Reply::Fail(message) => Err(StageboardError::backend(message)),
        }
    }
}

/// Three-stage pipeline used by most scenarios
pub const STAGES: [&str; 3] = ["Prospect", "Contacted", "Active"];

pub fn acme() -> Entity {
    Entity::new("Acme", "Prospect").with_id("acme")
}

pub fn globex() -> Entity {
    Entity::new("Globex", "Contacted").with_id("globex")
}
