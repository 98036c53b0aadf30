use crate::config::LoggingConfig;
use crate::error::{Result, RouteLogError};
use crate::logs::path::{DriveTable, PathResolver};
use crate::logs::reader::{self, LatestLog, LogFileInfo};
use crate::logs::rotation::{RotationManager, RotationOptions, RotationReport};
use crate::logs::router::{LogRouter, Route, RouteRequest, RouteState};
use crate::logs::writer::{LogRecord, LogWriter};
use std::path::{Path, PathBuf};

/// What happened to one logged message
#[derive(Debug, Clone)]
pub struct LogOutcome {
    pub route: Route,
    /// Formatted line, when the caller asked for a pass-through copy
    pub line: Option<String>,
    /// Whether the line reached the log file
    pub written: bool,
}

/// One independent logger: owns its config, routing memory and writer
///
/// Several managers can live in one process without sharing state.
pub struct LogManager {
    router: LogRouter,
    writer: LogWriter,
    rotation: RotationManager,
}

impl LogManager {
    /// Create a logger, resolving its root from the operating system
    ///
    /// # Returns
    /// * `Ok(LogManager)` - Ready to log; without a resolvable root it runs
    ///   in host-output-only mode
    /// * `Err(RouteLogError)` - The configuration is invalid
    pub fn new(config: LoggingConfig) -> Result<Self> {
        Self::with_resolver(config, &PathResolver::new())
    }

    /// Create a logger using a specific path resolver
    pub fn with_resolver<D: DriveTable>(
        config: LoggingConfig,
        resolver: &PathResolver<D>,
    ) -> Result<Self> {
        config.validate()?;
        let root = resolve_root(&config, resolver);

        Ok(Self {
            router: LogRouter::new(config, root),
            writer: LogWriter::new(),
            rotation: RotationManager::new(),
        })
    }

    /// Re-initialize with a new configuration, forgetting routing memory
    pub fn init(&mut self, config: LoggingConfig) -> Result<()> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Route and write one message
    ///
    /// Never fails: write errors are logged as warnings and the message is
    /// still available to the caller through the pass-through copy.
    pub fn log(&mut self, request: &RouteRequest) -> LogOutcome {
        let route = self.router.route(request);

        if route.announce {
            match &route.target {
                Some(target) => {
                    tracing::info!("Logging {} to {}", route.source, target.display())
                }
                None => tracing::warn!("No logging path available; output goes to the host only"),
            }
        }

        let record = LogRecord::new(request.level, &route.source, &request.message);

        let mut written = false;
        let line = match (&route.target, route.persist) {
            (Some(target), true) => match self.writer.write(target, &record, route.prepare_dir) {
                Ok(line) => {
                    written = true;
                    line
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    record.to_line()
                }
            },
            _ => record.to_line(),
        };

        LogOutcome {
            route,
            line: request.pass_through.then_some(line),
            written,
        }
    }

    /// Log an informational message from `source`
    pub fn info(&mut self, source: &str, message: &str) -> LogOutcome {
        self.log(&RouteRequest::new(message).source(source))
    }

    /// Newest log whose name contains `filter`, with its last `line_count` lines
    pub fn read_latest(&self, filter: Option<&str>, line_count: usize) -> Result<LatestLog> {
        reader::read_latest(self.require_root()?, filter, line_count)
    }

    /// Log files under the root, newest first
    pub fn list_logs(&self, filter: Option<&str>, limit: Option<usize>) -> Result<Vec<LogFileInfo>> {
        reader::list_logs(self.require_root()?, filter, limit)
    }

    /// Rotate the logs under the root
    pub fn rotate(&self, options: &RotationOptions) -> Result<RotationReport> {
        self.rotation.rotate(self.require_root()?, options)
    }

    /// The process-visible logging root; `None` in host-output-only mode
    pub fn logging_path(&self) -> Option<&Path> {
        self.router.root()
    }

    pub fn config(&self) -> &LoggingConfig {
        self.router.config()
    }

    pub fn route_state(&self) -> &RouteState {
        self.router.state()
    }

    /// Lines written to disk by this logger
    pub fn lines_written(&self) -> u64 {
        self.writer.lines_written()
    }

    fn require_root(&self) -> Result<&Path> {
        self.logging_path().ok_or_else(|| {
            RouteLogError::PathResolution("no logging path is configured".to_string())
        })
    }
}

fn resolve_root<D: DriveTable>(config: &LoggingConfig, resolver: &PathResolver<D>) -> Option<PathBuf> {
    match resolver.resolve(config.root_path.as_deref()) {
        Ok(root) => Some(root),
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    }
}
