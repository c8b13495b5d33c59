//! Configuration types and loading.

mod settings;

pub use settings::{DagpilotConfig, EpicPaths, ExecutorConfig, SchedulerConfig};
