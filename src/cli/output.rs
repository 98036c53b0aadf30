// Output formatting and display for CLI

use crate::logs::{Level, LatestLog, LogFileInfo, LogLine, RotationReport, RotationStatus, Route};
use chrono::{DateTime, Local};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Tell the operator where output from a source now goes
pub fn print_announce(route: &Route) {
    match &route.target {
        Some(target) => println!(
            "{} {} {} {}",
            "→".cyan().bold(),
            "Logging".bold(),
            route.source.cyan(),
            format!("to {}", target.display()).dimmed()
        ),
        None => print_warning("No logging path available; output goes to the host only"),
    }
}

/// Print a warning message to stderr
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print one log line, colouring the level tag
pub fn print_log_line(line: &str) {
    let parsed = LogLine::parse(line);
    let Some(timestamp) = parsed.timestamp else {
        println!("{}", line);
        return;
    };

    let tag = match parsed.level {
        Level::Info => String::new(),
        Level::Debug => format!("{} ", "[DEBUG]".blue()),
        Level::Verbose => format!("{} ", "[VERBOSE]".magenta()),
    };
    println!("{} {}{}", timestamp.dimmed(), tag, parsed.message);
}

/// Print the header and tail of the newest log
pub fn print_latest(latest: &LatestLog) {
    println!(
        "\n{} {}",
        latest.file.name.bold().underline(),
        format!(
            "(modified {}, {})",
            latest.file.modified.format("%Y-%m-%d %H:%M:%S"),
            format_size(latest.file.size)
        )
        .dimmed()
    );
    println!();

    for line in &latest.tail {
        print_log_line(line);
    }

    if !latest.tail.is_empty() {
        println!();
    }
}

/// Print a formatted table of log files
pub fn print_log_table(files: &[LogFileInfo]) {
    if files.is_empty() {
        println!("{}", "No log files found".yellow());
        return;
    }

    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Modified")]
        modified: String,
        #[tabled(rename = "Age")]
        age: String,
        #[tabled(rename = "Size")]
        size: String,
    }

    let now = Local::now();
    let rows: Vec<LogRow> = files
        .iter()
        .map(|f| LogRow {
            name: truncate(&f.name, 40),
            modified: f.modified.format("%Y-%m-%d %H:%M").to_string(),
            age: format_age(&f.modified, &now),
            size: format_size(f.size),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    println!(
        "{}",
        format!("Total: {} file(s)", files.len()).dimmed().italic()
    );
}

/// Print the outcome of a rotation
pub fn print_rotation_report(report: &RotationReport) {
    match report.status {
        RotationStatus::Skipped { next_due } => {
            let next_due: DateTime<Local> = next_due.into();
            println!(
                "{} {}",
                "ℹ".blue().bold(),
                format!(
                    "Rotation not due until {}",
                    next_due.format("%Y-%m-%d %H:%M")
                )
            );
        }
        RotationStatus::Executed => {
            println!("{}", "✓ Logs rotated".green().bold());
            println!("  {:<10} {}", "Moved:".bold(), report.moved);
            println!("  {:<10} {}", "Purged:".bold(), report.purged);

            let failures = report.move_failures + report.delete_failures;
            if failures > 0 {
                println!(
                    "  {:<10} {}",
                    "Skipped:".bold(),
                    failures.to_string().yellow()
                );
            }
        }
    }
}

/// Format the time since `modified` in human-readable form
fn format_age(modified: &DateTime<Local>, now: &DateTime<Local>) -> String {
    let secs = (*now - *modified).num_seconds().max(0) as u64;
    format_duration(&Duration::from_secs(secs))
}

/// Format a duration in human-readable format
fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Format a file size in human-readable format
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

/// Truncate a string to a maximum number of characters
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Create a spinner for long operations
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a spinner with success
pub fn finish_progress_success(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

/// Finish a spinner with error
pub fn finish_progress_error(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✗".red(), message));
}
