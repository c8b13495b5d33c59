//! Plain append-only operational log for engine self-diagnostics,
//! separate from the manifest's audit trail.

use std::path::PathBuf;

use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

#[derive(Clone)]
pub struct OpLog {
    path: PathBuf,
}

impl OpLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Appends one timestamped line. Best effort: a log-write failure never
    /// propagates to the caller.
    pub async fn append(&self, message: &str) {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("[{}] {}\n", timestamp, message);

        if let Some(dir) = self.path.parent()
            && let Err(e) = tokio::fs::create_dir_all(dir).await
        {
            warn!(error = %e, "Failed to create operational log directory");
            return;
        }

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;

        match result {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    warn!(error = %e, "Failed to write operational log");
                }
            }
            Err(e) => warn!(error = %e, path = %self.path.display(), "Failed to open operational log"),
        }
    }

    /// Returns the last `n` lines, oldest first. Missing log yields empty.
    pub async fn tail(&self, n: usize) -> Vec<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let lines: Vec<&str> = content.lines().collect();
                let start = lines.len().saturating_sub(n);
                lines[start..].iter().map(|s| s.to_string()).collect()
            }
            Err(_) => Vec::new(),
        }
    }
}
