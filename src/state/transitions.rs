use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::manifest::{ManifestAccessor, StatusSet};

/// Applies the pending -> in-progress -> {completed|failed} state machine to
/// manifest entries through the accessor.
///
/// Every transition maps to idempotent set edits, so replaying the same exit
/// event twice leaves the manifest in the same state as applying it once.
#[derive(Clone)]
pub struct TransitionEngine {
    store: Arc<dyn ManifestAccessor>,
}

impl TransitionEngine {
    pub fn new(store: Arc<dyn ManifestAccessor>) -> Self {
        Self { store }
    }

    /// pending -> in-progress, applied just before the executor is spawned.
    pub async fn start(&self, task_id: &str) -> Result<()> {
        self.store
            .move_task(task_id, StatusSet::Pending, StatusSet::InProgress)
            .await?;
        debug!(task_id, "Task transitioned to in-progress");
        Ok(())
    }

    /// in-progress -> completed.
    pub async fn complete(&self, task_id: &str) -> Result<()> {
        self.store
            .move_task(task_id, StatusSet::InProgress, StatusSet::Completed)
            .await?;
        debug!(task_id, "Task transitioned to completed");
        Ok(())
    }

    /// {pending|in-progress} -> failed, with the error text attached.
    ///
    /// Removal is defensive over both source sets: a spawn failure may be
    /// observed before the in-progress move committed.
    pub async fn fail(&self, task_id: &str, error: &str) -> Result<()> {
        self.store.move_to_failed(task_id, error).await?;
        warn!(task_id, error, "Task transitioned to failed");
        Ok(())
    }
}
