//! Executor process spawn, tracking, and reaping.

use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::error::{OrchestratorError, Result};

/// Engine-local record of one running executor. Never persisted; exists only
/// between spawn and reap and does not survive an engine restart.
#[derive(Debug, Clone)]
pub struct ActiveProcess {
    pub task_id: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub command: String,
}

/// Emitted exactly once per spawned executor when its exit is observed.
#[derive(Debug)]
pub struct ExitEvent {
    pub task_id: String,
    pub status: std::io::Result<std::process::ExitStatus>,
}

impl ExitEvent {
    /// Exit code 0 is the sole success signal.
    pub fn is_success(&self) -> bool {
        matches!(&self.status, Ok(status) if status.success())
    }

    pub fn describe(&self) -> String {
        match &self.status {
            Ok(status) => match status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            },
            Err(e) => format!("wait failed: {}", e),
        }
    }
}

/// Owns the active-process map, the engine's only in-memory mutable state.
///
/// Exit handling is message-passing: each spawned waiter task sends one
/// `ExitEvent` on the channel the scan loop consumes, so no callbacks nest
/// and audit entries stay in causal order per task.
pub struct ProcessManager {
    executor: ExecutorConfig,
    epic: String,
    active: RwLock<std::collections::HashMap<String, ActiveProcess>>,
    exit_tx: mpsc::UnboundedSender<ExitEvent>,
    exit_rx: Mutex<Option<mpsc::UnboundedReceiver<ExitEvent>>>,
}

impl ProcessManager {
    pub fn new(executor: ExecutorConfig, epic: impl Into<String>) -> Arc<Self> {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            executor,
            epic: epic.into(),
            active: RwLock::new(std::collections::HashMap::new()),
            exit_tx,
            exit_rx: Mutex::new(Some(exit_rx)),
        })
    }

    /// Takes the exit-event receiver. Held by exactly one consumer at a time;
    /// the scan loop gives it back on shutdown so the engine can restart.
    pub fn take_exit_receiver(&self) -> Option<mpsc::UnboundedReceiver<ExitEvent>> {
        self.exit_rx.lock().take()
    }

    pub fn restore_exit_receiver(&self, rx: mpsc::UnboundedReceiver<ExitEvent>) {
        *self.exit_rx.lock() = Some(rx);
    }

    pub fn active_ids(&self) -> HashSet<String> {
        self.active.read().keys().cloned().collect()
    }

    pub fn active_processes(&self) -> Vec<ActiveProcess> {
        self.active.read().values().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    pub fn is_tracking(&self, task_id: &str) -> bool {
        self.active.read().contains_key(task_id)
    }

    /// Removes a task's tracking entry the instant its exit is handled.
    pub fn remove(&self, task_id: &str) -> Option<ActiveProcess> {
        self.active.write().remove(task_id)
    }

    /// Spawns one executor for the task and registers a waiter task that
    /// reports its termination on the exit channel.
    ///
    /// The single-threaded scan loop plus the resolver's active-set exclusion
    /// guarantee a task id is never tracked twice concurrently; the insert
    /// guard here only turns a violated assumption into an error.
    pub fn spawn(self: &Arc<Self>, task_id: &str) -> Result<ActiveProcess> {
        if self.is_tracking(task_id) {
            return Err(OrchestratorError::Spawn {
                task_id: task_id.to_string(),
                message: "task already has an active process".to_string(),
            });
        }

        let command_line = self.command_line(task_id);

        let mut child = Command::new(&self.executor.program)
            .args(&self.executor.base_args)
            .arg(&self.epic)
            .arg("--task")
            .arg(task_id)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OrchestratorError::Spawn {
                task_id: task_id.to_string(),
                message: e.to_string(),
            })?;

        let pid = child.id().ok_or_else(|| OrchestratorError::Spawn {
            task_id: task_id.to_string(),
            message: "child exited before pid was observed".to_string(),
        })?;

        let process = ActiveProcess {
            task_id: task_id.to_string(),
            pid,
            started_at: Utc::now(),
            command: command_line,
        };

        self.active
            .write()
            .insert(task_id.to_string(), process.clone());

        let exit_tx = self.exit_tx.clone();
        let waiter_task_id = task_id.to_string();
        tokio::spawn(async move {
            let status = child.wait().await;
            let _ = exit_tx.send(ExitEvent {
                task_id: waiter_task_id,
                status,
            });
        });

        info!(task_id, pid, "Executor process started");
        Ok(process)
    }

    /// Best-effort SIGTERM to every tracked executor, then clears the map.
    /// Safe to call when nothing is tracked.
    pub fn terminate_all(&self) {
        let drained: Vec<ActiveProcess> = self.active.write().drain().map(|(_, p)| p).collect();

        for process in drained {
            debug!(task_id = %process.task_id, pid = process.pid, "Terminating executor");
            if let Err(e) = terminate(process.pid) {
                warn!(pid = process.pid, error = %e, "Failed to signal executor");
            }
        }
    }

    fn command_line(&self, task_id: &str) -> String {
        let mut parts = vec![self.executor.program.clone()];
        parts.extend(self.executor.base_args.iter().cloned());
        parts.push(self.epic.clone());
        parts.push("--task".to_string());
        parts.push(task_id.to_string());
        parts.join(" ")
    }
}

#[cfg(unix)]
fn terminate(pid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn terminate(pid: u32) -> std::io::Result<()> {
    std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T"])
        .output()
        .map(|_| ())
}
