use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{AuditEntry, DependencyGraph, FailedRef, Manifest, StatusSet};
use crate::error::{OrchestratorError, Result};

/// Mutation and read primitives over the persisted manifest.
///
/// Each mutation is a single atomic edit: it either lands fully or the call
/// fails and the document is unchanged. Callers must not assume partial
/// success. The engine holds no manifest state between calls.
#[async_trait]
pub trait ManifestAccessor: Send + Sync {
    /// Reads the whole current graph. Never incremental.
    async fn read_dependency_graph(&self) -> Result<DependencyGraph>;

    /// Moves a task id between status partitions. Removal from `from` is an
    /// idempotent no-op when the id is absent; the task's `status` field is
    /// updated together with the partition lists.
    async fn move_task(&self, task_id: &str, from: StatusSet, to: StatusSet) -> Result<()>;

    /// Moves a task to the failed partition with the captured error text,
    /// removing it from pending or in-progress, whichever holds it.
    async fn move_to_failed(&self, task_id: &str, error: &str) -> Result<()>;

    /// Appends one entry to the manifest's audit trail.
    async fn append_audit_entry(&self, entry: AuditEntry) -> Result<()>;

    async fn load(&self) -> Result<Manifest>;

    fn exists(&self) -> bool;
}

/// File-backed manifest store. One YAML document per epic; every mutation is
/// a self-contained read-modify-write with an atomic temp + rename commit.
pub struct FileManifestStore {
    path: PathBuf,
}

impl FileManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn init(&self, manifest: &Manifest) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        self.recover_interrupted_writes().await;
        self.save(manifest).await
    }

    pub async fn save(&self, manifest: &Manifest) -> Result<()> {
        let content = serde_yaml_bw::to_string(manifest)?;
        self.write_atomic(&content).await
    }

    async fn write_atomic(&self, content: &str) -> Result<()> {
        let tmp_path = self.path.with_extension("yaml.tmp");

        fs::write(&tmp_path, content).await?;

        let tmp_path_clone = tmp_path.clone();
        let sync_result = tokio::task::spawn_blocking(move || {
            std::fs::File::open(&tmp_path_clone).and_then(|file| file.sync_all())
        })
        .await;

        match sync_result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to sync temp manifest to disk"),
            Err(e) => tracing::warn!(error = %e, "Failed to sync temp manifest to disk"),
        }

        // POSIX rename makes the edit atomic for readers.
        fs::rename(&tmp_path, &self.path).await?;

        debug!(path = %self.path.display(), "Manifest write committed");
        Ok(())
    }

    async fn recover_interrupted_writes(&self) {
        let tmp_path = self.path.with_extension("yaml.tmp");
        if tmp_path.exists() {
            debug!(path = %tmp_path.display(), "Removing interrupted manifest write");
            let _ = fs::remove_file(&tmp_path).await;
        }
    }

    async fn read(&self) -> Result<Manifest> {
        if !self.path.exists() {
            return Err(OrchestratorError::ManifestNotFound(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path).await?;
        serde_yaml_bw::from_str(&content)
            .map_err(|e| OrchestratorError::manifest("malformed manifest", e))
    }

    /// Read-modify-write with the edit applied in memory and committed as one
    /// atomic rename. The edit closure fails the whole call without touching
    /// the document.
    async fn edit<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Manifest) -> Result<()>,
    {
        let mut manifest = self.read().await?;
        edit(&mut manifest)?;
        self.save(&manifest).await
    }
}

#[async_trait]
impl ManifestAccessor for FileManifestStore {
    async fn read_dependency_graph(&self) -> Result<DependencyGraph> {
        let manifest = self.read().await?;

        let dependencies: HashMap<String, Vec<String>> = manifest
            .tasks
            .iter()
            .map(|t| (t.id.clone(), t.dependencies.clone()))
            .collect();

        Ok(DependencyGraph {
            pending: manifest.dag.pending.clone(),
            in_progress: manifest.dag.in_progress.clone(),
            completed: manifest.dag.completed.clone(),
            dependencies,
        })
    }

    async fn move_task(&self, task_id: &str, from: StatusSet, to: StatusSet) -> Result<()> {
        let id = task_id.to_string();
        self.edit(move |manifest| {
            manifest.dag.remove(from, &id);

            if !manifest.dag.contains(to, &id) {
                match to {
                    StatusSet::Pending => manifest.dag.pending.push(id.clone()),
                    StatusSet::InProgress => manifest.dag.in_progress.push(id.clone()),
                    StatusSet::Completed => manifest.dag.completed.push(id.clone()),
                    StatusSet::Failed => manifest.dag.failed.push(FailedRef {
                        id: id.clone(),
                        error: String::new(),
                    }),
                }
            }

            if let Some(task) = manifest.task_mut(&id) {
                task.status = to.status();
            }

            Ok(())
        })
        .await?;

        debug!(task_id, %from, %to, "Task moved");
        Ok(())
    }

    async fn move_to_failed(&self, task_id: &str, error: &str) -> Result<()> {
        let id = task_id.to_string();
        let error = error.to_string();
        self.edit(move |manifest| {
            // A spawn failure can land before the in-progress move did, so
            // clear both possible source sets.
            manifest.dag.remove(StatusSet::Pending, &id);
            manifest.dag.remove(StatusSet::InProgress, &id);

            match manifest.dag.failed.iter_mut().find(|f| f.id == id) {
                Some(existing) => existing.error = error.clone(),
                None => manifest.dag.failed.push(FailedRef {
                    id: id.clone(),
                    error: error.clone(),
                }),
            }

            if let Some(task) = manifest.task_mut(&id) {
                task.status = crate::state::TaskStatus::Failed;
            }

            Ok(())
        })
        .await?;

        debug!(task_id, "Task moved to failed");
        Ok(())
    }

    async fn append_audit_entry(&self, entry: AuditEntry) -> Result<()> {
        self.edit(move |manifest| {
            manifest.audit_log.push(entry);
            Ok(())
        })
        .await
    }

    async fn load(&self) -> Result<Manifest> {
        self.read().await
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}
