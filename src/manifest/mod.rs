//! Manifest model and accessor.
//!
//! The manifest is the single persisted source of truth for one epic. The
//! engine reads it whole at every scan and applies each mutation as one
//! atomic edit, so external operator edits between scans are tolerated.

mod store;
mod types;

pub use store::{FileManifestStore, ManifestAccessor};
pub use types::{
    AuditEntry, DagCounts, DependencyGraph, FailedRef, Manifest, StatusSet, StatusSets, Task,
    TaskRef,
};
