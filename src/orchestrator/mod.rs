//! The orchestration engine: scan loop, dependency resolution, and executor
//! process lifecycle.

mod engine;
mod process;
pub mod resolver;

pub use engine::{ActiveTask, EngineStatus, Orchestrator};
pub use process::{ActiveProcess, ExitEvent, ProcessManager};
