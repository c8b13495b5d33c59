use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use dagpilot::cli::{Cli, Commands, ConfigAction, Display, OutputFormat};
use dagpilot::config::{DagpilotConfig, EpicPaths};
use dagpilot::error::{OrchestratorError, Result};
use dagpilot::manifest::{FileManifestStore, ManifestAccessor};
use dagpilot::oplog::OpLog;
use dagpilot::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Display::new().print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("dagpilot=debug")
    } else {
        EnvFilter::new("dagpilot=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let display = Display::new();
    let output = cli.output;

    match cli.command {
        Commands::Init => cmd_init(&display).await,
        Commands::Start {
            epic,
            interval_secs,
        } => cmd_start(&display, &epic, interval_secs).await,
        Commands::Scan { epic } => cmd_scan(&display, &epic, output).await,
        Commands::Status { epic } => cmd_status(&display, &epic, output).await,
        Commands::Logs { lines } => cmd_logs(lines).await,
        Commands::Config { action } => cmd_config(&display, action, output).await,
    }
}

fn find_project_root() -> Result<PathBuf> {
    let current = std::env::current_dir()?;

    let mut path = current.as_path();
    loop {
        if path.join(".git").exists() {
            return Ok(path.to_path_buf());
        }
        path = path.parent().ok_or(OrchestratorError::NotInGitRepo)?;
    }
}

fn ensure_initialized(paths: &EpicPaths) -> Result<()> {
    if !paths.dagpilot_dir.exists() {
        return Err(OrchestratorError::NotInitialized);
    }
    Ok(())
}

async fn load_env(epic_required: bool) -> Result<(DagpilotConfig, EpicPaths)> {
    let root = find_project_root()?;
    let paths = EpicPaths::new(root);
    if epic_required {
        ensure_initialized(&paths)?;
    }
    let config = DagpilotConfig::load(&paths.dagpilot_dir).await?;
    Ok((config, paths))
}

async fn cmd_init(display: &Display) -> Result<()> {
    let root = find_project_root()?;
    let paths = EpicPaths::new(root);

    if paths.dagpilot_dir.exists() {
        display.print_warning("dagpilot is already initialized in this project.");
        return Ok(());
    }

    paths.ensure_dirs().await?;
    let config = DagpilotConfig::default();
    config.save(&paths.dagpilot_dir).await?;

    display.print_success("Initialized dagpilot.");
    display.print_info(&format!(
        "Configuration: {}",
        paths.dagpilot_dir.join("config.toml").display()
    ));
    display.print_info(&format!("Epics: {}", paths.epics_dir.display()));

    Ok(())
}

async fn cmd_start(display: &Display, epic: &str, interval_secs: Option<u64>) -> Result<()> {
    let (mut config, paths) = load_env(true).await?;
    if let Some(secs) = interval_secs {
        config.scheduler.scan_interval_secs = secs;
        config.validate()?;
    }

    let manifest_path = paths.manifest_path(epic);
    if !manifest_path.exists() {
        return Err(OrchestratorError::ManifestNotFound(manifest_path));
    }

    let orchestrator = Arc::new(Orchestrator::new(epic, config, &paths));
    Arc::clone(&orchestrator).start().await?;

    display.print_success(&format!("Orchestrator running for epic: {}", epic));
    display.print_info("Press Ctrl+C to stop.");

    wait_for_shutdown_signal().await?;

    display.print_info("Shutting down gracefully...");
    orchestrator.stop().await;
    display.print_success("Orchestrator stopped.");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

async fn cmd_scan(display: &Display, epic: &str, output: OutputFormat) -> Result<()> {
    let (config, paths) = load_env(true).await?;

    let orchestrator = Orchestrator::new(epic, config, &paths);
    orchestrator.run_once().await?;

    let manifest = FileManifestStore::new(paths.manifest_path(epic)).load().await?;
    match output {
        OutputFormat::Text => {
            display.print_success(&format!("Scan complete for epic: {}", epic));
            display.print_epic_summary(&manifest);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&manifest.dag_counts())?);
        }
    }

    Ok(())
}

async fn cmd_status(display: &Display, epic: &str, output: OutputFormat) -> Result<()> {
    let (_config, paths) = load_env(true).await?;

    let store = FileManifestStore::new(paths.manifest_path(epic));
    let manifest = store.load().await?;

    match output {
        OutputFormat::Text => {
            display.print_header(&format!("Epic: {}", manifest.epic_name));
            display.print_epic_summary(&manifest);

            let oplog = OpLog::new(paths.oplog_path());
            let recent = oplog.tail(10).await;
            if !recent.is_empty() {
                println!();
                println!("Recent engine activity:");
                for line in recent {
                    println!("  {}", line);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&manifest.dag_counts())?);
        }
    }

    Ok(())
}

async fn cmd_logs(lines: usize) -> Result<()> {
    let (_config, paths) = load_env(true).await?;

    let oplog = OpLog::new(paths.oplog_path());
    for line in oplog.tail(lines).await {
        println!("{}", line);
    }

    Ok(())
}

async fn cmd_config(display: &Display, action: ConfigAction, output: OutputFormat) -> Result<()> {
    let (config, paths) = load_env(false).await?;

    match action {
        ConfigAction::Show => match output {
            OutputFormat::Text => {
                let toml = toml::to_string_pretty(&config)
                    .map_err(|e| OrchestratorError::Config(e.to_string()))?;
                println!("{}", toml);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        },
        ConfigAction::Reset => {
            paths.ensure_dirs().await?;
            let config = DagpilotConfig::default();
            config.save(&paths.dagpilot_dir).await?;
            display.print_success("Configuration reset to defaults.");
        }
    }

    Ok(())
}
