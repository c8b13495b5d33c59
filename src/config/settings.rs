use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{OrchestratorError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DagpilotConfig {
    pub scheduler: SchedulerConfig,
    pub executor: ExecutorConfig,
}

impl DagpilotConfig {
    pub async fn load(dagpilot_dir: &Path) -> Result<Self> {
        let config_path = dagpilot_dir.join("config.toml");
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, dagpilot_dir: &Path) -> Result<()> {
        self.validate()?;
        let config_path = dagpilot_dir.join("config.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| OrchestratorError::Config(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.scheduler.scan_interval_secs == 0 {
            errors.push("scheduler.scan_interval_secs must be greater than 0");
        }
        if self.executor.program.is_empty() {
            errors.push("executor.program must not be empty");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(OrchestratorError::Config(errors.join("; ")))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between scans of the manifest.
    pub scan_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 300,
        }
    }
}

impl SchedulerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

/// External task executor. Invoked per task as
/// `<program> [base_args..] <epic> --task <task-id>`; its exit code is the
/// sole success signal (0 = success). Stdout and stderr are not parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub program: String,
    pub base_args: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: "dagpilot-run".to_string(),
            base_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpicPaths {
    pub root: PathBuf,
    pub claude_dir: PathBuf,
    pub dagpilot_dir: PathBuf,
    pub epics_dir: PathBuf,
}

impl EpicPaths {
    pub fn new(root: PathBuf) -> Self {
        let claude_dir = root.join(".claude");
        let dagpilot_dir = claude_dir.join("dagpilot");

        Self {
            epics_dir: claude_dir.join("epics"),
            root,
            claude_dir,
            dagpilot_dir,
        }
    }

    pub async fn ensure_dirs(&self) -> Result<()> {
        let dirs = [&self.dagpilot_dir, &self.epics_dir];
        for dir in dirs {
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    pub fn epic_dir(&self, epic: &str) -> PathBuf {
        self.epics_dir.join(epic)
    }

    pub fn manifest_path(&self, epic: &str) -> PathBuf {
        self.epic_dir(epic).join("manifest.yaml")
    }

    pub fn oplog_path(&self) -> PathBuf {
        self.dagpilot_dir.join("orchestrator.log")
    }
}
