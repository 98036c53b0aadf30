use crate::config::LoggingConfig;
use crate::logs::writer::Level;
use chrono::{Local, NaiveDate};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Source used when the caller gives none
pub const DEFAULT_SOURCE: &str = "Console";

/// Subdirectory of the root for diagnostic output
pub const DEBUG_SUBDIR: &str = "debug";

/// Messages starting with this token never trigger an announcement
const EXIT_TOKEN: &str = "Exit";

/// Router memory carried from one call to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteState {
    /// Source of the previous routed call
    pub last_source: Option<String>,
    /// Target file of the previous routed call
    pub last_target: Option<PathBuf>,
    /// The current target has not been written to since it changed
    pub intro_pending: bool,
}

/// What the caller wants logged
#[derive(Debug, Clone, Default)]
pub struct RouteRequest {
    pub message: String,
    pub source: Option<String>,
    pub level: Level,
    /// Write to this file instead of the computed one
    pub explicit_path: Option<PathBuf>,
    /// Route to the `debug/` subdirectory
    pub diagnostic: bool,
    /// Hand the formatted line back to the caller
    pub pass_through: bool,
}

impl RouteRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    pub fn diagnostic(mut self, diagnostic: bool) -> Self {
        self.diagnostic = diagnostic;
        self
    }

    pub fn pass_through(mut self, pass_through: bool) -> Self {
        self.pass_through = pass_through;
        self
    }
}

/// The routing decision for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Normalized source name
    pub source: String,
    /// File to append to; `None` means host output only
    pub target: Option<PathBuf>,
    pub stream: Level,
    /// Tell the operator where output now goes
    pub announce: bool,
    /// Whether the writer should touch the disk
    pub persist: bool,
    /// Create the target's parent directory before writing
    pub prepare_dir: bool,
}

/// Decides which file each message lands in
pub struct LogRouter {
    config: LoggingConfig,
    root: Option<PathBuf>,
    state: RouteState,
    degraded_announced: bool,
}

impl LogRouter {
    /// Create a router writing under `root`; `None` means no file target exists
    pub fn new(config: LoggingConfig, root: Option<PathBuf>) -> Self {
        Self {
            config,
            root,
            state: RouteState::default(),
            degraded_announced: false,
        }
    }

    /// Route a message using today's date
    pub fn route(&mut self, request: &RouteRequest) -> Route {
        self.route_on(request, Local::now().date_naive())
    }

    /// Route a message as if it were logged on `date`
    pub fn route_on(&mut self, request: &RouteRequest, date: NaiveDate) -> Route {
        let source = normalize_source(request.source.as_deref());
        let stream = request.level;

        let target = match (&request.explicit_path, &self.root) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(root)) => {
                let dir = if request.diagnostic || self.config.debug_mode {
                    root.join(DEBUG_SUBDIR)
                } else {
                    root.clone()
                };
                Some(dir.join(self.file_name(&source, date)))
            }
            (None, None) => None,
        };

        let Some(target) = target else {
            let announce = !self.degraded_announced;
            self.degraded_announced = true;
            return Route {
                source,
                target: None,
                stream,
                announce,
                persist: false,
                prepare_dir: false,
            };
        };

        let source_changed = self.state.last_source.as_deref() != Some(source.as_str());
        if source_changed {
            self.state.last_source = Some(source.clone());
        }

        if self.state.last_target.as_ref() != Some(&target) {
            self.state.last_target = Some(target.clone());
            self.state.intro_pending = true;
        }

        let announce = source_changed && !request.message.starts_with(EXIT_TOKEN);

        let persist = self.config.persists();
        let prepare_dir = persist && self.state.intro_pending;
        if prepare_dir {
            self.state.intro_pending = false;
        }

        tracing::debug!(
            source = %source,
            target = %target.display(),
            announce,
            "routed message"
        );

        Route {
            source,
            target: Some(target),
            stream,
            announce,
            persist,
            prepare_dir,
        }
    }

    /// `<source>_<date>.log` for the configured date pattern
    pub fn file_name(&self, source: &str, date: NaiveDate) -> String {
        let mut stamp = String::new();
        if write!(stamp, "{}", date.format(&self.config.date_pattern)).is_err() {
            stamp.clear();
            stamp.push_str(&date.format("%Y%m%d").to_string());
        }
        format!("{}_{}.log", source, stamp)
    }

    /// Get the logging root, if one was resolved
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    pub fn state(&self) -> &RouteState {
        &self.state
    }
}

/// Reduce a caller-supplied source to a bare logical name
///
/// Empty sources become [`DEFAULT_SOURCE`]; path-like sources keep only the
/// final segment, up to its first dot.
pub fn normalize_source(source: Option<&str>) -> String {
    let raw = source
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SOURCE);

    if !raw.contains('/') && !raw.contains('\\') {
        return raw.to_string();
    }

    let segment = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(raw);
    let stem = segment.split('.').next().unwrap_or(segment);
    if stem.is_empty() {
        DEFAULT_SOURCE.to_string()
    } else {
        stem.to_string()
    }
}
