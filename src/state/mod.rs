// State module - Persisted rotation bookkeeping

use crate::error::{Result, RouteLogError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Version of the state file format
const STATE_VERSION: &str = "1.0.0";

/// File name of the rotation record inside the archive directory
pub const STATE_FILE_NAME: &str = ".rotation-state.json";

/// When rotation last executed for one log root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    pub version: String,
    pub last_rotation: DateTime<Utc>,
    /// Files moved by that rotation
    pub moved: usize,
    /// Files purged by that rotation
    pub purged: usize,
}

impl RotationState {
    pub fn new(last_rotation: DateTime<Utc>, moved: usize, purged: usize) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            last_rotation,
            moved,
            purged,
        }
    }

    /// Validate the state structure
    pub fn validate(&self) -> Result<()> {
        if self.version != STATE_VERSION {
            return Err(RouteLogError::StateLoadError(format!(
                "Incompatible state version: expected {}, found {}",
                STATE_VERSION, self.version
            )));
        }
        Ok(())
    }
}

/// State store handles persistence of the rotation record
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a new state store with the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store for the record kept inside `archive_dir`
    pub fn in_archive(archive_dir: &Path) -> Self {
        Self::new(archive_dir.join(STATE_FILE_NAME))
    }

    /// Load the record; `None` when it has never been written
    pub fn load(&self) -> Result<Option<RotationState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path).map_err(|e| {
            RouteLogError::StateLoadError(format!("Failed to open state file: {}", e))
        })?;

        let state: RotationState = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            RouteLogError::StateLoadError(format!("Failed to parse state file: {}", e))
        })?;

        state.validate()?;

        Ok(Some(state))
    }

    /// Save the record with an atomic write
    pub fn save(&self, state: &RotationState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RouteLogError::StateSaveError(format!("Failed to create state directory: {}", e))
            })?;
        }

        // Write to a temporary file first, then rename over the record
        let temp_path = self.path.with_extension("tmp");

        {
            let file = File::create(&temp_path).map_err(|e| {
                RouteLogError::StateSaveError(format!("Failed to create temp state file: {}", e))
            })?;

            let mut writer = BufWriter::new(file);

            serde_json::to_writer_pretty(&mut writer, state).map_err(|e| {
                RouteLogError::StateSaveError(format!("Failed to serialize state: {}", e))
            })?;

            writer.flush().map_err(|e| {
                RouteLogError::StateSaveError(format!("Failed to flush state file: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            RouteLogError::StateSaveError(format!("Failed to rename temp state file: {}", e))
        })?;

        Ok(())
    }

    /// Get the path to the state file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether `name` is one of the store's own files
pub fn is_state_file(name: &str) -> bool {
    name == STATE_FILE_NAME || name == ".rotation-state.tmp"
}
