// CLI module - User-facing command-line interface

mod output;

use crate::config::{Preference, Settings};
use crate::logs::{
    Level, LogFollower, LogManager, RotationOptions, RouteRequest, DEFAULT_TAIL_LINES,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

/// How often `tail --follow` checks for new lines
const FOLLOW_INTERVAL: Duration = Duration::from_millis(500);

/// routelog - per-source log files with tailing and age-based rotation
#[derive(Parser)]
#[command(name = "routelog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Logging root (defaults to <Documents>/Logs)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Settings file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Route messages without writing them to disk
    #[arg(long, global = true)]
    ignore: bool,

    /// Send every message to the debug/ subdirectory
    #[arg(long, global = true)]
    debug_mode: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a message (reads lines from stdin when no message is given)
    Write {
        /// Message to log
        message: Option<String>,

        /// Logical source name; a script path is reduced to its base name
        #[arg(short, long)]
        source: Option<String>,

        /// Level: info, debug or verbose
        #[arg(short, long, default_value = "info")]
        level: Level,

        /// Write to the debug/ subdirectory
        #[arg(long)]
        diagnostic: bool,

        /// Print each formatted line as well
        #[arg(short, long)]
        echo: bool,

        /// Write to this file instead of the routed one
        #[arg(long)]
        target: Option<PathBuf>,
    },

    /// Show the end of the newest matching log
    Tail {
        /// Only consider files whose name contains this text
        filter: Option<String>,

        /// Number of lines to display
        #[arg(short = 'n', long, default_value_t = DEFAULT_TAIL_LINES)]
        lines: usize,

        /// Keep printing lines as they are appended
        #[arg(short, long)]
        follow: bool,
    },

    /// List recent log files
    List {
        /// Only list files whose name contains this text
        filter: Option<String>,

        /// Maximum number of files to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Archive aged logs and purge old archives
    Rotate {
        /// Move files at least this many days old
        #[arg(long)]
        age_days: Option<u64>,

        /// Delete archived files at least this many days old
        #[arg(long)]
        purge_days: Option<u64>,

        /// Minimum days between two rotations
        #[arg(long)]
        cadence_days: Option<u64>,

        /// Rotate even when not due
        #[arg(short, long)]
        force: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the resolved logging root
    Path,
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        let settings = self.settings()?;

        match &self.command {
            Commands::Write {
                message,
                source,
                level,
                diagnostic,
                echo,
                target,
            } => {
                let mut manager = LogManager::new(settings.logging)?;
                let template = RouteRequest {
                    source: source.clone(),
                    level: *level,
                    explicit_path: target.clone(),
                    diagnostic: *diagnostic,
                    pass_through: *echo,
                    ..RouteRequest::default()
                };

                match message {
                    Some(message) => {
                        write_message(&mut manager, &template, message.clone());
                        Ok(())
                    }
                    None => write_lines(&mut manager, &template, std::io::stdin().lock()),
                }
            }

            Commands::Tail {
                filter,
                lines,
                follow,
            } => {
                let manager = LogManager::new(settings.logging)?;
                let latest = match manager.read_latest(filter.as_deref(), *lines) {
                    Ok(latest) => latest,
                    Err(e) if e.is_warning() => {
                        output::print_warning(&e.to_string());
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                };

                output::print_latest(&latest);

                if *follow {
                    follow_log(LogFollower::from_end(&latest.file.path))?;
                }
                Ok(())
            }

            Commands::List { filter, limit } => {
                let manager = LogManager::new(settings.logging)?;
                let files = manager.list_logs(filter.as_deref(), *limit)?;
                output::print_log_table(&files);
                Ok(())
            }

            Commands::Rotate {
                age_days,
                purge_days,
                cadence_days,
                force,
                json,
            } => {
                let mut rotation = settings.rotation;
                if let Some(days) = age_days {
                    rotation.age_days = *days;
                }
                if let Some(days) = purge_days {
                    rotation.purge_days = *days;
                }
                if let Some(days) = cadence_days {
                    rotation.cadence_days = *days;
                }
                rotation.validate()?;

                let options = RotationOptions {
                    force: *force,
                    ..rotation.into()
                };

                let manager = LogManager::new(settings.logging)?;
                let spinner = (!*json).then(|| output::create_progress_bar("Rotating logs..."));
                let report = manager.rotate(&options);

                match (report, spinner) {
                    (Ok(report), Some(spinner)) => {
                        output::finish_progress_success(spinner, "Rotation finished");
                        output::print_rotation_report(&report);
                    }
                    (Ok(report), None) => {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    }
                    (Err(e), spinner) => {
                        if let Some(spinner) = spinner {
                            output::finish_progress_error(spinner, "Rotation failed");
                        }
                        if e.is_warning() {
                            output::print_warning(&e.to_string());
                        } else {
                            return Err(e.into());
                        }
                    }
                }
                Ok(())
            }

            Commands::Path => {
                let manager = LogManager::new(settings.logging)?;
                match manager.logging_path() {
                    Some(path) => println!("{}", path.display()),
                    None => output::print_warning("No logging path could be resolved"),
                }
                Ok(())
            }
        }
    }

    /// Settings from the optional file, overridden by command-line flags
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::default(),
        };

        if let Some(root) = &self.root {
            settings.logging.root_path = Some(root.clone());
        }
        if self.ignore {
            settings.logging.preference = Preference::Ignore;
        }
        if self.debug_mode {
            settings.logging.debug_mode = true;
        }

        Ok(settings)
    }
}

/// Log one message and echo what the caller asked to see
fn write_message(manager: &mut LogManager, template: &RouteRequest, message: String) {
    let request = RouteRequest {
        message,
        ..template.clone()
    };
    let outcome = manager.log(&request);
    if outcome.route.announce {
        output::print_announce(&outcome.route);
    }
    if let Some(line) = outcome.line {
        output::print_log_line(&line);
    }
}

/// Log each line of `input` as soon as it is read
fn write_lines<R: BufRead>(manager: &mut LogManager, template: &RouteRequest, input: R) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read messages from stdin")?;
        write_message(manager, template, line);
    }
    Ok(())
}

/// Print appended lines until interrupted
fn follow_log(mut follower: LogFollower) -> Result<()> {
    loop {
        for line in follower.poll()? {
            output::print_log_line(&line);
        }
        std::thread::sleep(FOLLOW_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_command() {
        let cli = Cli::try_parse_from([
            "routelog", "--root", "/tmp/logs", "write", "hello", "-s", "Deploy", "-l", "debug",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("/tmp/logs")));
        match cli.command {
            Commands::Write {
                message,
                source,
                level,
                ..
            } => {
                assert_eq!(message.as_deref(), Some("hello"));
                assert_eq!(source.as_deref(), Some("Deploy"));
                assert_eq!(level, Level::Debug);
            }
            _ => panic!("expected write"),
        }
    }

    /// Yields one line, then fails as a broken pipe would
    struct OneLineThenError {
        sent: bool,
    }

    impl std::io::Read for OneLineThenError {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
            }
            self.sent = true;
            let line = b"first line\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_write_lines_logs_before_input_ends() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut manager =
            LogManager::new(crate::config::LoggingConfig::with_root(temp_dir.path())).unwrap();
        let template = RouteRequest::new("").source("Deploy");

        let input = std::io::BufReader::new(OneLineThenError { sent: false });
        assert!(write_lines(&mut manager, &template, input).is_err());

        let latest = manager.read_latest(Some("Deploy"), 5).unwrap();
        assert_eq!(latest.tail.len(), 1);
        assert!(latest.tail[0].ends_with(" first line"));
    }

    #[test]
    fn test_write_lines_reads_every_line() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut manager =
            LogManager::new(crate::config::LoggingConfig::with_root(temp_dir.path())).unwrap();
        let template = RouteRequest::new("").source("Build");

        write_lines(&mut manager, &template, "one\ntwo\nthree\n".as_bytes()).unwrap();

        assert_eq!(manager.lines_written(), 3);
        assert_eq!(manager.route_state().last_source.as_deref(), Some("Build"));
    }

    #[test]
    fn test_parse_rejects_unknown_level() {
        let result = Cli::try_parse_from(["routelog", "write", "x", "--level", "loud"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tail_defaults() {
        let cli = Cli::try_parse_from(["routelog", "tail", "Deploy"]).unwrap();
        match cli.command {
            Commands::Tail {
                filter,
                lines,
                follow,
            } => {
                assert_eq!(filter.as_deref(), Some("Deploy"));
                assert_eq!(lines, DEFAULT_TAIL_LINES);
                assert!(!follow);
            }
            _ => panic!("expected tail"),
        }
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::try_parse_from(["routelog", "path", "--root", "/srv/logs", "--ignore"])
            .unwrap();
        let settings = cli.settings().unwrap();

        assert_eq!(settings.logging.root_path, Some(PathBuf::from("/srv/logs")));
        assert_eq!(settings.logging.preference, Preference::Ignore);
        assert_eq!(settings.rotation.age_days, 7);
    }
}
