use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::process::{ExitEvent, ProcessManager};
use super::resolver;
use crate::audit::{AuditAction, AuditLogger};
use crate::config::{DagpilotConfig, EpicPaths};
use crate::error::{OrchestratorError, Result};
use crate::manifest::{FileManifestStore, ManifestAccessor, TaskRef};
use crate::oplog::OpLog;
use crate::state::TransitionEngine;

/// The orchestration engine for one epic.
///
/// Walks the persisted manifest on a timer, spawns an executor per eligible
/// task, reaps exits, and records every decision in the manifest's audit
/// trail. One engine instance per manifest; nothing enforces this across
/// processes, so pointing two instances at one manifest is a race.
pub struct Orchestrator {
    epic: String,
    config: DagpilotConfig,
    store: Arc<dyn ManifestAccessor>,
    transitions: TransitionEngine,
    audit: AuditLogger,
    oplog: OpLog,
    processes: Arc<ProcessManager>,
    running: AtomicBool,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

/// Snapshot of the engine's control surface.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub epic: String,
    pub active_task_count: usize,
    pub active_tasks: Vec<ActiveTask>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveTask {
    pub task_id: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl Orchestrator {
    pub fn new(epic: impl Into<String>, config: DagpilotConfig, paths: &EpicPaths) -> Self {
        let epic = epic.into();
        let store: Arc<dyn ManifestAccessor> =
            Arc::new(FileManifestStore::new(paths.manifest_path(&epic)));
        let oplog = OpLog::new(paths.oplog_path());
        Self::with_store(epic, config, store, oplog)
    }

    /// Builds an engine over any manifest accessor. The seam the tests use.
    pub fn with_store(
        epic: impl Into<String>,
        config: DagpilotConfig,
        store: Arc<dyn ManifestAccessor>,
        oplog: OpLog,
    ) -> Self {
        let epic = epic.into();
        let processes = ProcessManager::new(config.executor.clone(), epic.clone());
        let transitions = TransitionEngine::new(store.clone());
        let audit = AuditLogger::new(store.clone(), oplog.clone());

        Self {
            epic,
            config,
            store,
            transitions,
            audit,
            oplog,
            processes,
            running: AtomicBool::new(false),
            shutdown_tx: Mutex::new(None),
            loop_handle: Mutex::new(None),
        }
    }

    pub fn epic(&self) -> &str {
        &self.epic
    }

    /// Starts the scan loop: one immediate scan, then recurring scans at the
    /// configured interval until `stop()`. Fails when the manifest does not
    /// exist (unrecoverable startup failure) or the engine already runs.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        if !self.store.exists() {
            return Err(OrchestratorError::Manifest(format!(
                "no manifest for epic '{}'",
                self.epic
            )));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(OrchestratorError::AlreadyRunning(self.epic.clone()));
        }

        let exits = match self.processes.take_exit_receiver() {
            Some(rx) => rx,
            None => {
                self.running.store(false, Ordering::SeqCst);
                return Err(OrchestratorError::AlreadyRunning(self.epic.clone()));
            }
        };

        info!(
            epic = %self.epic,
            interval_secs = self.config.scheduler.scan_interval_secs,
            "Starting orchestrator"
        );
        self.oplog
            .append(&format!(
                "orchestrator started for epic {} (interval {}s)",
                self.epic, self.config.scheduler.scan_interval_secs
            ))
            .await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        self.scan().await;

        let this = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            this.run_loop(shutdown_rx, exits).await;
        });
        *self.loop_handle.lock() = Some(handle);

        Ok(())
    }

    /// Cancels the recurring scans, signals every tracked executor, and
    /// clears the active-process map. Safe to call when nothing runs.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!(epic = %self.epic, "Orchestrator not running");
            return;
        }

        info!(epic = %self.epic, "Stopping orchestrator");

        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(true);
        }

        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        self.processes.terminate_all();
        self.oplog
            .append(&format!("orchestrator stopped for epic {}", self.epic))
            .await;
    }

    /// One scan, then waits for every spawned executor of that scan to exit
    /// and applies the resulting transitions. The one-shot `scan` command.
    pub async fn run_once(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(OrchestratorError::AlreadyRunning(self.epic.clone()));
        }
        if !self.store.exists() {
            return Err(OrchestratorError::Manifest(format!(
                "no manifest for epic '{}'",
                self.epic
            )));
        }

        let mut exits = self
            .processes
            .take_exit_receiver()
            .ok_or_else(|| OrchestratorError::AlreadyRunning(self.epic.clone()))?;

        self.scan().await;

        while self.processes.active_count() > 0 {
            match exits.recv().await {
                Some(event) => self.handle_exit(event).await,
                None => break,
            }
        }

        self.processes.restore_exit_receiver(exits);
        Ok(())
    }

    pub fn status(&self) -> EngineStatus {
        let active_tasks: Vec<ActiveTask> = self
            .processes
            .active_processes()
            .into_iter()
            .map(|p| ActiveTask {
                task_id: p.task_id,
                pid: p.pid,
                started_at: p.started_at,
            })
            .collect();

        EngineStatus {
            running: self.running.load(Ordering::SeqCst),
            epic: self.epic.clone(),
            active_task_count: active_tasks.len(),
            active_tasks,
        }
    }

    /// Single scan-loop task: recurring ticks, exit events, shutdown. Scans
    /// never overlap and exit handling interleaves between them, which keeps
    /// per-task audit entries in causal order without any locking.
    async fn run_loop(
        &self,
        mut shutdown: watch::Receiver<bool>,
        mut exits: mpsc::UnboundedReceiver<ExitEvent>,
    ) {
        let mut ticker = tokio::time::interval(self.config.scheduler.scan_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; the startup scan already ran.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.scan().await;
                }
                Some(event) = exits.recv() => {
                    self.handle_exit(event).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!(epic = %self.epic, "Scan loop shutdown");
                        break;
                    }
                }
            }
        }

        self.processes.restore_exit_receiver(exits);
    }

    /// One pass: load graph, resolve executable tasks, dispatch each. Any
    /// failure is contained here; a bad scan never stops the scheduler.
    async fn scan(&self) {
        let graph = match self.store.read_dependency_graph().await {
            Ok(graph) => graph,
            Err(e) => {
                warn!(epic = %self.epic, error = %e, "Scan aborted: manifest unreadable");
                self.oplog.append(&format!("scan failed: {}", e)).await;
                self.audit
                    .record(
                        AuditAction::ScanError,
                        format!("Orchestrator scan failed: {}", e),
                    )
                    .await;
                return;
            }
        };

        let executable = resolver::find_executable(&graph, &self.processes.active_ids());

        if executable.is_empty() {
            debug!(epic = %self.epic, "No executable tasks in current DAG state");
            return;
        }

        let ids: Vec<&str> = executable.iter().map(|t| t.id.as_str()).collect();
        info!(epic = %self.epic, count = executable.len(), tasks = ?ids, "Executable tasks found");
        self.oplog
            .append(&format!(
                "scan found {} executable task(s): {}",
                executable.len(),
                ids.join(", ")
            ))
            .await;

        for task in &executable {
            self.execute(task).await;
        }
    }

    /// Moves one task to in-progress and spawns its executor. Errors here
    /// never abort other tasks in the same scan.
    async fn execute(&self, task: &TaskRef) {
        if let Err(e) = self.transitions.start(&task.id).await {
            // Left pending; the next scan retries.
            warn!(task_id = %task.id, error = %e, "Failed to mark task in-progress");
            self.oplog
                .append(&format!("could not start task {}: {}", task.id, e))
                .await;
            return;
        }

        match self.processes.spawn(&task.id) {
            Ok(process) => {
                self.audit
                    .record(
                        AuditAction::TaskStarted,
                        format!(
                            "Orchestrator started task {} (pid {})",
                            task.id, process.pid
                        ),
                    )
                    .await;
                self.oplog
                    .append(&format!(
                        "started task {} (pid {})",
                        task.id, process.pid
                    ))
                    .await;
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Executor spawn failed");
                if let Err(te) = self.transitions.fail(&task.id, &e.to_string()).await {
                    warn!(task_id = %task.id, error = %te, "Failed to record spawn failure");
                }
                self.audit
                    .record(
                        AuditAction::TaskFailed,
                        format!("Orchestrator task {} failed to spawn: {}", task.id, e),
                    )
                    .await;
                self.oplog
                    .append(&format!("spawn failed for task {}: {}", task.id, e))
                    .await;
            }
        }
    }

    /// Applies the terminal transition for one observed executor exit.
    async fn handle_exit(&self, event: ExitEvent) {
        self.processes.remove(&event.task_id);

        if event.is_success() {
            info!(task_id = %event.task_id, "Task completed");
            if let Err(e) = self.transitions.complete(&event.task_id).await {
                warn!(task_id = %event.task_id, error = %e, "Failed to record completion");
            }
            self.audit
                .record(
                    AuditAction::TaskCompleted,
                    format!("Orchestrator completed task {} successfully", event.task_id),
                )
                .await;
            self.oplog
                .append(&format!("task {} completed", event.task_id))
                .await;
        } else {
            let reason = event.describe();
            warn!(task_id = %event.task_id, reason = %reason, "Task failed");
            if let Err(e) = self.transitions.fail(&event.task_id, &reason).await {
                warn!(task_id = %event.task_id, error = %e, "Failed to record failure");
            }
            self.audit
                .record(
                    AuditAction::TaskFailed,
                    format!("Orchestrator task {} failed ({})", event.task_id, reason),
                )
                .await;
            self.oplog
                .append(&format!("task {} failed: {}", event.task_id, reason))
                .await;
        }
    }
}
