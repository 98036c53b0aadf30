use std::path::PathBuf;
use thiserror::Error;

/// Main error type for routelog
#[derive(Debug, Error)]
pub enum RouteLogError {
    // Path resolution errors
    #[error("Unable to resolve logging root: {0}")]
    PathResolution(String),

    #[error("Failed to create log directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Read errors
    #[error("No log file found: {0}")]
    NotFound(String),

    // Rotation errors (per file, normally swallowed and counted)
    #[error("Failed to move {0}: {1}")]
    Move(PathBuf, String),

    #[error("Failed to delete {0}: {1}")]
    Delete(PathBuf, String),

    // Log file errors
    #[error("Log error: {0}")]
    LogError(String),

    #[error("Failed to open log file: {0}")]
    LogFileError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Rotation state errors
    #[error("Failed to load rotation state: {0}")]
    StateLoadError(String),

    #[error("Failed to save rotation state: {0}")]
    StateSaveError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouteLogError {
    /// Whether the error is a non-blocking warning rather than a failure
    pub fn is_warning(&self) -> bool {
        matches!(self, RouteLogError::NotFound(_))
    }
}

/// Result type alias for routelog operations
pub type Result<T> = std::result::Result<T, RouteLogError>;
