// Logs module - Routing, writing, reading and rotation of per-source log files

mod manager;
mod path;
mod reader;
mod rotation;
mod router;
mod writer;

pub use manager::{LogManager, LogOutcome};
pub use path::{DriveTable, MountedDrive, PathResolver, SystemDrives, LOGS_SUBDIR};
pub use reader::{
    list_logs, read_last_lines, read_latest, LatestLog, LogFileInfo, LogFollower, LogLine,
    DEFAULT_TAIL_LINES,
};
pub use rotation::{
    file_age_days, BulkMover, FsMover, MoveOutcome, MoveRequest, RotationManager,
    RotationOptions, RotationReport, RotationStatus, ARCHIVE_DIR, ROTATION_LOG_PREFIX,
};
pub use router::{
    normalize_source, LogRouter, Route, RouteRequest, RouteState, DEBUG_SUBDIR, DEFAULT_SOURCE,
};
pub use writer::{normalize_message, Level, LogRecord, LogWriter, TIMESTAMP_FORMAT};
