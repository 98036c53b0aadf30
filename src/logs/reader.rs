use crate::error::{Result, RouteLogError};
use crate::logs::writer::Level;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Default number of tail lines
pub const DEFAULT_TAIL_LINES: usize = 10;

/// Basic metadata about a log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFileInfo {
    pub name: String,
    pub path: PathBuf,
    pub modified: DateTime<Local>,
    pub size: u64,
}

/// The newest matching log file and its last lines
#[derive(Debug, Clone, Serialize)]
pub struct LatestLog {
    pub file: LogFileInfo,
    pub tail: Vec<String>,
}

/// A log line split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: Option<String>,
    pub level: Level,
    pub message: String,
}

impl LogLine {
    /// Parse `YYYY-MM-DD HH:MM:SS [LEVEL] message`
    ///
    /// Lines that do not start with a timestamp are kept whole as the message.
    pub fn parse(line: &str) -> Self {
        let (timestamp, rest) = match split_timestamp(line) {
            Some((timestamp, rest)) => (Some(timestamp.to_string()), rest),
            None => {
                return Self {
                    timestamp: None,
                    level: Level::Info,
                    message: line.to_string(),
                }
            }
        };

        for level in [Level::Debug, Level::Verbose] {
            if let Some(tag) = level.tag() {
                if let Some(message) = rest.strip_prefix(tag) {
                    return Self {
                        timestamp,
                        level,
                        message: message.trim_start().to_string(),
                    };
                }
            }
        }

        Self {
            timestamp,
            level: Level::Info,
            message: rest.to_string(),
        }
    }
}

/// Timestamp is the first 19 characters when they match `%Y-%m-%d %H:%M:%S`
fn split_timestamp(line: &str) -> Option<(&str, &str)> {
    let candidate = line.get(..19)?;
    chrono::NaiveDateTime::parse_from_str(candidate, crate::logs::writer::TIMESTAMP_FORMAT).ok()?;
    Some((candidate, line[19..].trim_start()))
}

/// List log files directly under `root`, newest first
///
/// A file matches when its name contains `filter` (an empty filter matches
/// every `.log` file). Ties on modification time are broken by name.
pub fn list_logs(root: &Path, filter: Option<&str>, limit: Option<usize>) -> Result<Vec<LogFileInfo>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let filter = filter.unwrap_or("");
    let mut files = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.ends_with(".log") || !name.contains(filter) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        files.push(LogFileInfo {
            name,
            path: entry.path(),
            modified: modified.into(),
            size: metadata.len(),
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));

    if let Some(limit) = limit {
        files.truncate(limit);
    }

    Ok(files)
}

/// Find the newest log matching `filter` and return its last `line_count` lines
///
/// # Returns
/// * `Ok(LatestLog)` - The file's metadata and tail (empty when `line_count` is 0)
/// * `Err(RouteLogError::NotFound)` - No file matched
pub fn read_latest(root: &Path, filter: Option<&str>, line_count: usize) -> Result<LatestLog> {
    let file = list_logs(root, filter, Some(1))?
        .into_iter()
        .next()
        .ok_or_else(|| {
            RouteLogError::NotFound(match filter {
                Some(filter) if !filter.is_empty() => {
                    format!("no log matching '{}' in {}", filter, root.display())
                }
                _ => format!("no logs in {}", root.display()),
            })
        })?;

    let tail = if line_count == 0 {
        Vec::new()
    } else {
        read_last_lines(&file.path, line_count)?
    };

    Ok(LatestLog { file, tail })
}

/// Read the last `lines` lines of a file
pub fn read_last_lines(file_path: &Path, lines: usize) -> Result<Vec<String>> {
    let mut file = File::open(file_path)
        .map_err(|e| RouteLogError::LogFileError(format!("{}: {}", file_path.display(), e)))?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| RouteLogError::LogError(format!("Failed to read log file: {}", e)))?;

    let content = String::from_utf8_lossy(&bytes);
    let mut tail = VecDeque::with_capacity(lines);
    for line in content.lines() {
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line.to_string());
    }

    Ok(tail.into_iter().collect())
}

/// Picks up lines appended to a log file between polls
pub struct LogFollower {
    path: PathBuf,
    position: u64,
    partial: String,
}

impl LogFollower {
    /// Follow from the beginning of the file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            position: 0,
            partial: String::new(),
        }
    }

    /// Follow only what is appended from now on
    pub fn from_end(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let position = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            path,
            position,
            partial: String::new(),
        }
    }

    /// Return complete lines appended since the last poll
    ///
    /// A missing file yields nothing; a file that shrank is re-read from the start.
    pub fn poll(&mut self) -> Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RouteLogError::LogFileError(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let len = file.metadata()?.len();
        if len < self.position {
            self.position = 0;
            self.partial.clear();
        }

        file.seek(SeekFrom::Start(self.position))
            .map_err(|e| RouteLogError::LogError(format!("Failed to seek in log file: {}", e)))?;

        let mut bytes = Vec::new();
        let read = file
            .read_to_end(&mut bytes)
            .map_err(|e| RouteLogError::LogError(format!("Failed to read log line: {}", e)))?;
        self.position += read as u64;

        self.partial.push_str(&String::from_utf8_lossy(&bytes));

        let mut lines = Vec::new();
        while let Some(newline) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=newline).collect();
            lines.push(line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string());
        }

        Ok(lines)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
