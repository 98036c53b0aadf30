use crate::error::{Result, RouteLogError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Fixed, locale-independent timestamp format of every log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity stream a message is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Info,
    Debug,
    Verbose,
}

impl Level {
    /// Bracketed tag written before the message, if any
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Level::Info => None,
            Level::Debug => Some("[DEBUG]"),
            Level::Verbose => Some("[VERBOSE]"),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "info"),
            Level::Debug => write!(f, "debug"),
            Level::Verbose => write!(f, "verbose"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" | "normal" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "verbose" => Ok(Level::Verbose),
            other => Err(format!(
                "Unknown level: {}. Use info, debug or verbose",
                other
            )),
        }
    }
}

/// A single message on its way to disk; never stored, only rendered
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub source: String,
    pub message: String,
}

impl LogRecord {
    /// Build a record stamped with the current local time
    pub fn new(level: Level, source: &str, message: &str) -> Self {
        Self::at(Local::now(), level, source, message)
    }

    pub fn at(timestamp: DateTime<Local>, level: Level, source: &str, message: &str) -> Self {
        Self {
            timestamp,
            level,
            source: source.to_string(),
            message: normalize_message(message),
        }
    }

    /// Render as `<timestamp> [LEVEL] <message>` (no tag for Info)
    pub fn to_line(&self) -> String {
        let timestamp = self.timestamp.format(TIMESTAMP_FORMAT);
        match self.level.tag() {
            Some(tag) => format!("{} {} {}", timestamp, tag, self.message),
            None => format!("{} {}", timestamp, self.message),
        }
    }
}

/// Flatten a message onto one physical line
///
/// Line breaks become spaces, runs of two or more whitespace characters
/// collapse to one space, and surrounding whitespace is trimmed.
pub fn normalize_message(message: &str) -> String {
    let mut normalized = String::with_capacity(message.len());
    let mut run = String::new();

    for c in message.chars() {
        let c = if c == '\n' || c == '\r' { ' ' } else { c };
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        flush_whitespace(&mut normalized, &mut run);
        normalized.push(c);
    }
    flush_whitespace(&mut normalized, &mut run);

    normalized.trim().to_string()
}

fn flush_whitespace(out: &mut String, run: &mut String) {
    if run.chars().count() >= 2 {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}

/// Appends rendered records to log files
#[derive(Debug, Default)]
pub struct LogWriter {
    /// Lines appended by this writer
    lines_written: u64,
    /// Bytes appended by this writer
    bytes_written: u64,
}

impl LogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to `target`
    ///
    /// # Arguments
    /// * `target` - Log file to append to
    /// * `record` - Record to render
    /// * `prepare_dir` - Create the parent directory first (best effort)
    ///
    /// # Returns
    /// * `Ok(String)` - The line that was written, for echoing to the host
    /// * `Err(RouteLogError)` - The file could not be opened or appended
    pub fn write(&mut self, target: &Path, record: &LogRecord, prepare_dir: bool) -> Result<String> {
        if prepare_dir {
            ensure_parent_dir(target);
        }

        let line = record.to_line();
        let entry = format_log_entry(&line);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(target)
            .map_err(|e| {
                RouteLogError::LogFileError(format!("{}: {}", target.display(), e))
            })?;

        file.write_all(&entry)
            .map_err(|e| RouteLogError::LogError(format!("Failed to write to log: {}", e)))?;

        file.flush()
            .map_err(|e| RouteLogError::LogError(format!("Failed to flush log: {}", e)))?;

        self.lines_written += 1;
        self.bytes_written += entry.len() as u64;

        Ok(line)
    }

    /// Get the number of lines appended so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Get the number of bytes appended so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// Terminate a rendered line for appending
fn format_log_entry(line: &str) -> Vec<u8> {
    let mut entry = Vec::with_capacity(line.len() + 1);
    entry.extend_from_slice(line.as_bytes());
    entry.push(b'\n');
    entry
}

/// Create the parent directory of `target`; failures only warn
pub(crate) fn ensure_parent_dir(target: &Path) {
    let Some(parent) = target.parent() else {
        return;
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return;
    }

    if let Err(source) = std::fs::create_dir_all(parent) {
        let err = RouteLogError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        };
        tracing::warn!("{}", err);
    }
}
