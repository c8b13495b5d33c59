use std::path::PathBuf;

use dagpilot::error::OrchestratorError;
use dagpilot::manifest::{
    AuditEntry, FileManifestStore, Manifest, ManifestAccessor, StatusSet, Task,
};
use dagpilot::state::TaskStatus;

fn sample_manifest() -> Manifest {
    Manifest::new("test-epic")
        .with_task(Task::new("a").with_description("first"))
        .with_task(Task::new("b").with_dependencies(vec!["a".to_string()]))
        .with_task(Task::new("c").with_dependencies(vec!["a".to_string(), "b".to_string()]))
}

async fn store_with_manifest(dir: &tempfile::TempDir) -> FileManifestStore {
    let store = FileManifestStore::new(dir.path().join("manifest.yaml"));
    store.init(&sample_manifest()).await.unwrap();
    store
}

/// Every task id must be in exactly one partition.
fn assert_partition_invariant(manifest: &Manifest) {
    for task in &manifest.tasks {
        let memberships = [
            manifest.dag.pending.iter().any(|t| *t == task.id),
            manifest.dag.in_progress.iter().any(|t| *t == task.id),
            manifest.dag.completed.iter().any(|t| *t == task.id),
            manifest.dag.failed.iter().any(|f| f.id == task.id),
        ]
        .iter()
        .filter(|m| **m)
        .count();

        assert_eq!(memberships, 1, "task {} is in {} partitions", task.id, memberships);
    }
}

#[tokio::test]
async fn test_read_dependency_graph() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_manifest(&dir).await;

    let graph = store.read_dependency_graph().await.unwrap();

    assert_eq!(graph.pending, vec!["a", "b", "c"]);
    assert!(graph.in_progress.is_empty());
    assert!(graph.completed.is_empty());
    assert_eq!(graph.dependencies["b"], vec!["a"]);
    assert_eq!(graph.dependencies["c"], vec!["a", "b"]);
}

#[tokio::test]
async fn test_move_task_updates_partitions_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_manifest(&dir).await;

    store
        .move_task("a", StatusSet::Pending, StatusSet::InProgress)
        .await
        .unwrap();

    let manifest = store.load().await.unwrap();
    assert!(!manifest.dag.pending.iter().any(|t| t == "a"));
    assert_eq!(manifest.dag.in_progress, vec!["a"]);
    assert_eq!(manifest.task("a").unwrap().status, TaskStatus::InProgress);
    assert_partition_invariant(&manifest);
}

#[tokio::test]
async fn test_completion_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_manifest(&dir).await;

    store
        .move_task("a", StatusSet::Pending, StatusSet::InProgress)
        .await
        .unwrap();

    // Applying the same completion twice must land in the same final state.
    store
        .move_task("a", StatusSet::InProgress, StatusSet::Completed)
        .await
        .unwrap();
    store
        .move_task("a", StatusSet::InProgress, StatusSet::Completed)
        .await
        .unwrap();

    let manifest = store.load().await.unwrap();
    assert_eq!(manifest.dag.completed, vec!["a"]);
    assert_eq!(manifest.task("a").unwrap().status, TaskStatus::Completed);
    assert_partition_invariant(&manifest);
}

#[tokio::test]
async fn test_move_to_failed_from_pending() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_manifest(&dir).await;

    // Spawn failure path: the task never reached in-progress.
    store.move_to_failed("a", "binary not found").await.unwrap();

    let manifest = store.load().await.unwrap();
    assert!(!manifest.dag.pending.iter().any(|t| t == "a"));
    assert_eq!(manifest.dag.failed.len(), 1);
    assert_eq!(manifest.dag.failed[0].id, "a");
    assert_eq!(manifest.dag.failed[0].error, "binary not found");
    assert_eq!(manifest.task("a").unwrap().status, TaskStatus::Failed);
    assert_partition_invariant(&manifest);
}

#[tokio::test]
async fn test_move_to_failed_from_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_manifest(&dir).await;

    store
        .move_task("a", StatusSet::Pending, StatusSet::InProgress)
        .await
        .unwrap();
    store.move_to_failed("a", "exit code 1").await.unwrap();

    let manifest = store.load().await.unwrap();
    assert!(manifest.dag.in_progress.is_empty());
    assert_eq!(manifest.dag.failed[0].error, "exit code 1");
    assert_partition_invariant(&manifest);
}

#[tokio::test]
async fn test_failure_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_manifest(&dir).await;

    store.move_to_failed("a", "exit code 1").await.unwrap();
    store.move_to_failed("a", "exit code 1").await.unwrap();

    let manifest = store.load().await.unwrap();
    assert_eq!(manifest.dag.failed.len(), 1);
    assert_partition_invariant(&manifest);
}

#[tokio::test]
async fn test_audit_entries_append_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_manifest(&dir).await;

    store
        .append_audit_entry(AuditEntry::new("TASK_STARTED", "started a"))
        .await
        .unwrap();
    store
        .append_audit_entry(AuditEntry::new("TASK_COMPLETED", "completed a"))
        .await
        .unwrap();

    let manifest = store.load().await.unwrap();
    assert_eq!(manifest.audit_log.len(), 2);
    assert_eq!(manifest.audit_log[0].action, "TASK_STARTED");
    assert_eq!(manifest.audit_log[1].action, "TASK_COMPLETED");
    assert_eq!(manifest.audit_log[0].actor, "orchestrator");
    assert!(manifest.audit_log[0].timestamp <= manifest.audit_log[1].timestamp);
}

#[tokio::test]
async fn test_missing_manifest_fails_reads() {
    let store = FileManifestStore::new(PathBuf::from("/nonexistent/manifest.yaml"));

    let err = store.read_dependency_graph().await.unwrap_err();
    assert!(matches!(err, OrchestratorError::ManifestNotFound(_)));
}

#[tokio::test]
async fn test_malformed_manifest_fails_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.yaml");
    tokio::fs::write(&path, "{{{ not yaml").await.unwrap();

    let store = FileManifestStore::new(path);
    let err = store.read_dependency_graph().await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Manifest(_)));
}

#[tokio::test]
async fn test_failed_mutation_leaves_document_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_manifest(&dir).await;
    let before = tokio::fs::read_to_string(dir.path().join("manifest.yaml"))
        .await
        .unwrap();

    // Corrupt the document; the mutation must fail without partial writes.
    tokio::fs::write(dir.path().join("manifest.yaml"), "{{{ not yaml")
        .await
        .unwrap();
    assert!(
        store
            .move_task("a", StatusSet::Pending, StatusSet::InProgress)
            .await
            .is_err()
    );

    let after = tokio::fs::read_to_string(dir.path().join("manifest.yaml"))
        .await
        .unwrap();
    assert_eq!(after, "{{{ not yaml");
    assert_ne!(before, after);
}

#[tokio::test]
async fn test_init_recovers_interrupted_write() {
    let dir = tempfile::tempdir().unwrap();
    let tmp = dir.path().join("manifest.yaml.tmp");
    tokio::fs::write(&tmp, "partial").await.unwrap();

    let store = FileManifestStore::new(dir.path().join("manifest.yaml"));
    store.init(&sample_manifest()).await.unwrap();

    assert!(!tmp.exists());
    assert!(store.exists());
}
