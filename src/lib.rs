pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod oplog;
pub mod orchestrator;
pub mod state;

pub use audit::{AuditAction, AuditLogger};
pub use config::{DagpilotConfig, EpicPaths};
pub use error::{OrchestratorError, Result};
pub use manifest::{AuditEntry, FileManifestStore, Manifest, ManifestAccessor, StatusSet, Task};
pub use oplog::OpLog;
pub use orchestrator::{EngineStatus, Orchestrator};
pub use state::{TaskStatus, TransitionEngine};
