use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "dagpilot")]
#[command(author, version, about = "Autonomous DAG task orchestrator for epic manifests", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize dagpilot in the current project
    Init,

    /// Run the orchestrator daemon for an epic (foreground; Ctrl+C stops)
    Start {
        /// Epic name (manifest at .claude/epics/<epic>/manifest.yaml)
        epic: String,

        /// Seconds between scans (overrides config)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Run a single scan for an epic and wait for spawned tasks to finish
    Scan {
        /// Epic name
        epic: String,
    },

    /// Show epic progress and recent engine activity
    Status {
        /// Epic name
        epic: String,
    },

    /// Show the engine's operational log
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Reset to defaults
    Reset,
}
