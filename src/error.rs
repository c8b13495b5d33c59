use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Task not found in manifest: {0}")]
    TaskNotFound(String),

    #[error("Failed to spawn executor for task {task_id}: {message}")]
    Spawn { task_id: String, message: String },

    #[error("Executor for task {task_id} failed: {message}")]
    Execution { task_id: String, message: String },

    #[error("Audit write failed: {0}")]
    AuditWrite(String),

    #[error("Orchestrator already running for epic: {0}")]
    AlreadyRunning(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not in a git repository")]
    NotInGitRepo,

    #[error("Project not initialized. Run 'dagpilot init' first.")]
    NotInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl OrchestratorError {
    /// Wrap an underlying error as a manifest failure with context.
    pub fn manifest(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Manifest(format!("{}: {}", context, err))
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
