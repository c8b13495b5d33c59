use console::{Style, style};

use crate::manifest::Manifest;
use crate::state::TaskStatus;

pub struct Display;

impl Display {
    pub fn new() -> Self {
        Self
    }

    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", style(text).bold().cyan());
        println!("{}", style("═".repeat(60)).dim());
        println!();
    }

    pub fn print_epic_summary(&self, manifest: &Manifest) {
        let dag = &manifest.dag;
        let total = manifest.tasks.len();
        let completed = dag.completed.len();
        let percentage = if total > 0 {
            (completed * 100 / total) as u8
        } else {
            0
        };

        println!(
            "Pending: {}  In progress: {}  Completed: {}  Failed: {}",
            style(dag.pending.len()).dim(),
            style(dag.in_progress.len()).yellow(),
            style(completed).green(),
            style(dag.failed.len()).red()
        );
        println!(
            "Progress: {} {}% ({}/{})",
            self.progress_bar(percentage, 30),
            percentage,
            completed,
            total
        );
        println!();

        if total > 0 {
            println!(
                "{:<20} {:<14} {:<24}",
                style("Task").bold(),
                style("Status").bold(),
                style("Dependencies").bold()
            );
            println!("{}", style("─".repeat(60)).dim());

            for task in &manifest.tasks {
                let deps = if task.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    task.dependencies.join(", ")
                };
                println!(
                    "{:<20} {:<14} {:<24}",
                    task.id,
                    self.status_style(task.status)
                        .apply_to(task.status.to_string()),
                    style(deps).dim()
                );
            }
        }

        if !dag.failed.is_empty() {
            println!();
            println!("{}", style("Failures:").bold().red());
            for failure in &dag.failed {
                println!("  {} {}: {}", style("✗").red(), failure.id, failure.error);
            }
        }
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", style("✓").green().bold(), message);
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    pub fn print_warning(&self, message: &str) {
        println!("{} {}", style("!").yellow().bold(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("{} {}", style("→").cyan(), message);
    }

    fn status_style(&self, status: TaskStatus) -> Style {
        match status {
            TaskStatus::Pending => Style::new().dim(),
            TaskStatus::InProgress => Style::new().yellow().bold(),
            TaskStatus::Completed => Style::new().green(),
            TaskStatus::Failed => Style::new().red().bold(),
        }
    }

    fn progress_bar(&self, percentage: u8, width: usize) -> String {
        let filled = (width as f64 * percentage as f64 / 100.0) as usize;
        let empty = width - filled;

        format!(
            "{}{}",
            style("█".repeat(filled)).green(),
            style("░".repeat(empty)).dim()
        )
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
