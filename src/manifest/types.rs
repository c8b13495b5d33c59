use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::TaskStatus;

/// The persisted source of truth for one epic's execution plan.
///
/// Created by a planning step outside the engine and reloaded fresh on every
/// scan, so operator edits between scans are always picked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub epic_name: String,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub dag: StatusSets,

    #[serde(default)]
    pub audit_log: Vec<AuditEntry>,
}

impl Manifest {
    pub fn new(epic_name: impl Into<String>) -> Self {
        Self {
            epic_name: epic_name.into(),
            tasks: Vec::new(),
            dag: StatusSets::default(),
            audit_log: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.dag.pending.push(task.id.clone());
        self.tasks.push(task);
        self
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// True when no task remains pending or in progress.
    pub fn is_complete(&self) -> bool {
        self.dag.pending.is_empty() && self.dag.in_progress.is_empty()
    }

    pub fn dag_counts(&self) -> DagCounts {
        DagCounts {
            epic: self.epic_name.clone(),
            total: self.tasks.len(),
            pending: self.dag.pending.len(),
            in_progress: self.dag.in_progress.len(),
            completed: self.dag.completed.len(),
            failed: self.dag.failed.len(),
        }
    }
}

/// Partition sizes, for machine-readable status output.
#[derive(Debug, Clone, Serialize)]
pub struct DagCounts {
    pub epic: String,
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

/// A unit of work. `agent` is an opaque executor selector passed through to
/// the spawned process; the engine never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub agent: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            agent: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// The four disjoint status partitions over task ids. Every task id lives in
/// exactly one list at all times; the lists and each task's `status` field
/// are mutated together by the manifest store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSets {
    #[serde(default)]
    pub pending: Vec<String>,

    #[serde(default)]
    pub in_progress: Vec<String>,

    #[serde(default)]
    pub completed: Vec<String>,

    #[serde(default)]
    pub failed: Vec<FailedRef>,
}

impl StatusSets {
    pub fn contains(&self, set: StatusSet, id: &str) -> bool {
        match set {
            StatusSet::Pending => self.pending.iter().any(|t| t == id),
            StatusSet::InProgress => self.in_progress.iter().any(|t| t == id),
            StatusSet::Completed => self.completed.iter().any(|t| t == id),
            StatusSet::Failed => self.failed.iter().any(|t| t.id == id),
        }
    }

    /// Removes `id` from `set`. A no-op returning false when absent, so
    /// replayed transitions stay idempotent.
    pub fn remove(&mut self, set: StatusSet, id: &str) -> bool {
        fn drain<T>(list: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
            let before = list.len();
            list.retain(|t| !pred(t));
            list.len() != before
        }

        match set {
            StatusSet::Pending => drain(&mut self.pending, |t| t == id),
            StatusSet::InProgress => drain(&mut self.in_progress, |t| t == id),
            StatusSet::Completed => drain(&mut self.completed, |t| t == id),
            StatusSet::Failed => drain(&mut self.failed, |t| t.id == id),
        }
    }
}

/// Names one of the four status partitions for mutation primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSet {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StatusSet {
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Pending => TaskStatus::Pending,
            Self::InProgress => TaskStatus::InProgress,
            Self::Completed => TaskStatus::Completed,
            Self::Failed => TaskStatus::Failed,
        }
    }
}

impl std::fmt::Display for StatusSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status())
    }
}

/// A failed task reference with the captured error text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRef {
    pub id: String,

    #[serde(default)]
    pub error: String,
}

/// An immutable, timestamped record of one orchestration decision.
/// Appended to the manifest's audit log, never mutated or pruned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub description: String,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: "orchestrator".to_string(),
            action: action.into(),
            description: description.into(),
        }
    }
}

/// Snapshot of the dependency graph as read from the manifest. Always read
/// whole, never incrementally, so concurrent external edits are tolerated.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Pending task ids in manifest order.
    pub pending: Vec<String>,
    pub in_progress: Vec<String>,
    pub completed: Vec<String>,
    pub dependencies: std::collections::HashMap<String, Vec<String>>,
}

/// A task selected for execution by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub id: String,
    pub dependencies: Vec<String>,
}
