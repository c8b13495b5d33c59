//! Audit trail recording.
//!
//! Every orchestration decision is appended to the manifest's audit log. A
//! failed audit write must never block task execution, so failures are
//! diverted to the operational log and swallowed.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::manifest::{AuditEntry, ManifestAccessor};
use crate::oplog::OpLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    ScanError,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskStarted => "TASK_STARTED",
            Self::TaskCompleted => "TASK_COMPLETED",
            Self::TaskFailed => "TASK_FAILED",
            Self::ScanError => "SCAN_ERROR",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn ManifestAccessor>,
    oplog: OpLog,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn ManifestAccessor>, oplog: OpLog) -> Self {
        Self { store, oplog }
    }

    /// Appends one timestamped entry to the manifest audit trail.
    pub async fn record(&self, action: AuditAction, description: impl Into<String>) {
        let description = description.into();
        let entry = AuditEntry::new(action.as_str(), description.clone());

        if let Err(e) = self.store.append_audit_entry(entry).await {
            warn!(%action, error = %e, "Audit write failed");
            self.oplog
                .append(&format!("audit write failed for {}: {}", action, e))
                .await;
        }
    }
}
