use crate::error::{Result, RouteLogError};
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Whether log entries are persisted to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    /// Write every routed message to its log file
    #[default]
    Continue,
    /// Compute routes but never touch the disk (host output only)
    Ignore,
}

/// Settings for one logger, fixed for its lifetime unless re-initialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Explicit logging root; resolved from the user's documents when absent
    #[serde(default)]
    pub root_path: Option<PathBuf>,

    /// strftime pattern for the date part of log file names
    #[serde(default = "default_date_pattern")]
    pub date_pattern: String,

    /// Whether messages are persisted
    #[serde(default)]
    pub preference: Preference,

    /// Route every call to the `debug/` subdirectory
    #[serde(default)]
    pub debug_mode: bool,
}

/// Age thresholds and cadence for log rotation, all in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Files at least this old are moved into the archive
    #[serde(default = "default_age_days")]
    pub age_days: u64,

    /// Archived files at least this old are deleted
    #[serde(default = "default_purge_days")]
    pub purge_days: u64,

    /// Minimum interval between two executed rotations
    #[serde(default = "default_cadence_days")]
    pub cadence_days: u64,
}

// Default value functions for serde
fn default_date_pattern() -> String {
    "%Y%m%d".to_string()
}

fn default_age_days() -> u64 {
    7
}

fn default_purge_days() -> u64 {
    90
}

fn default_cadence_days() -> u64 {
    10
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            date_pattern: default_date_pattern(),
            preference: Preference::default(),
            debug_mode: false,
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            age_days: default_age_days(),
            purge_days: default_purge_days(),
            cadence_days: default_cadence_days(),
        }
    }
}

impl LoggingConfig {
    /// Config rooted at an explicit directory
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root_path: Some(root.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Whether routed messages should be written to disk
    pub fn persists(&self) -> bool {
        self.preference == Preference::Continue
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_date_pattern(&self.date_pattern)
    }
}

/// Largest accepted value for any rotation threshold (1000 years)
pub const MAX_THRESHOLD_DAYS: u64 = 365_000;

impl RotationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, days) in [
            ("age_days", self.age_days),
            ("purge_days", self.purge_days),
            ("cadence_days", self.cadence_days),
        ] {
            if days > MAX_THRESHOLD_DAYS {
                return Err(RouteLogError::ConfigValidationError(format!(
                    "{} ({}) must not exceed {}",
                    name, days, MAX_THRESHOLD_DAYS
                )));
            }
        }

        if self.purge_days < self.age_days {
            return Err(RouteLogError::ConfigValidationError(format!(
                "purge_days ({}) must not be lower than age_days ({})",
                self.purge_days, self.age_days
            )));
        }
        Ok(())
    }
}

/// Rejects patterns chrono cannot render and patterns that would split a file name
fn validate_date_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(RouteLogError::ConfigValidationError(
            "date_pattern must not be empty".to_string(),
        ));
    }

    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(RouteLogError::ConfigValidationError(format!(
            "Invalid date_pattern: {}",
            pattern
        )));
    }

    let rendered = Local::now().format(pattern).to_string();
    if rendered.contains('/') || rendered.contains('\\') {
        return Err(RouteLogError::ConfigValidationError(format!(
            "date_pattern renders a path separator: {}",
            rendered
        )));
    }

    Ok(())
}

/// Everything the command-line tool can read from a settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rotation: RotationConfig,
}

impl Settings {
    /// Load settings from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Settings> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RouteLogError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut settings = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(RouteLogError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        settings.expand_env_vars();
        settings.validate()?;

        Ok(settings)
    }

    fn parse_toml(contents: &str) -> Result<Settings> {
        toml::from_str(contents)
            .map_err(|e| RouteLogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    fn parse_json(contents: &str) -> Result<Settings> {
        serde_json::from_str(contents)
            .map_err(|e| RouteLogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate both sections
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.rotation.validate()
    }

    fn expand_env_vars(&mut self) {
        if let Some(ref root) = self.logging.root_path {
            self.logging.root_path = Some(expand_env_in_path(root));
        }
    }
}

/// Expand `$VAR` and `${VAR}` references in a string
fn expand_env_in_string(s: &str) -> String {
    let mut vars: Vec<(String, String)> = std::env::vars().collect();
    // Longest names first so $HOMEPATH is not clobbered by $HOME
    vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut result = s.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("${{{}}}", key), &value);
        result = result.replace(&format!("${}", key), &value);
    }

    result
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(expand_env_in_string(&path_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.root_path, None);
        assert_eq!(logging.date_pattern, "%Y%m%d");
        assert_eq!(logging.preference, Preference::Continue);
        assert!(!logging.debug_mode);

        let rotation = RotationConfig::default();
        assert_eq!(rotation.age_days, 7);
        assert_eq!(rotation.purge_days, 90);
        assert_eq!(rotation.cadence_days, 10);
    }

    #[test]
    fn test_persists_follows_preference() {
        let mut config = LoggingConfig::with_root("/tmp/logs");
        assert!(config.persists());

        config.preference = Preference::Ignore;
        assert!(!config.persists());
    }

    #[test]
    fn test_validate_bad_date_pattern() {
        let config = LoggingConfig {
            date_pattern: "%Y%Q".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RouteLogError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_validate_date_pattern_with_separator() {
        let config = LoggingConfig {
            date_pattern: "%Y/%m/%d".to_string(),
            ..LoggingConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LoggingConfig {
            date_pattern: String::new(),
            ..LoggingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_threshold_upper_bound() {
        let rotation = RotationConfig {
            cadence_days: MAX_THRESHOLD_DAYS + 1,
            ..RotationConfig::default()
        };
        assert!(matches!(
            rotation.validate(),
            Err(RouteLogError::ConfigValidationError(_))
        ));

        let rotation = RotationConfig {
            age_days: u64::MAX,
            purge_days: u64::MAX,
            cadence_days: 1,
        };
        assert!(rotation.validate().is_err());

        let rotation = RotationConfig {
            age_days: MAX_THRESHOLD_DAYS,
            purge_days: MAX_THRESHOLD_DAYS,
            cadence_days: MAX_THRESHOLD_DAYS,
        };
        assert!(rotation.validate().is_ok());
    }

    #[test]
    fn test_validate_purge_below_age() {
        let rotation = RotationConfig {
            age_days: 30,
            purge_days: 10,
            cadence_days: 1,
        };
        assert!(matches!(
            rotation.validate(),
            Err(RouteLogError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_parse_toml() {
        let toml_content = r#"
            [logging]
            root_path = "/var/log/routelog"
            preference = "ignore"

            [rotation]
            age_days = 3
        "#;

        let settings = Settings::parse_toml(toml_content).unwrap();
        assert_eq!(
            settings.logging.root_path,
            Some(PathBuf::from("/var/log/routelog"))
        );
        assert_eq!(settings.logging.preference, Preference::Ignore);
        assert_eq!(settings.logging.date_pattern, "%Y%m%d");
        assert_eq!(settings.rotation.age_days, 3);
        assert_eq!(settings.rotation.purge_days, 90);
    }

    #[test]
    fn test_parse_json() {
        let json_content = r#"
            {
                "logging": { "debug_mode": true },
                "rotation": { "cadence_days": 1 }
            }
        "#;

        let settings = Settings::parse_json(json_content).unwrap();
        assert!(settings.logging.debug_mode);
        assert_eq!(settings.rotation.cadence_days, 1);
        assert_eq!(settings.rotation.age_days, 7);
    }

    #[test]
    fn test_expand_env_in_root() {
        std::env::set_var("ROUTELOG_TEST_BASE", "/srv/data");

        let mut settings = Settings {
            logging: LoggingConfig::with_root("${ROUTELOG_TEST_BASE}/logs"),
            rotation: RotationConfig::default(),
        };
        settings.expand_env_vars();

        assert_eq!(
            settings.logging.root_path,
            Some(PathBuf::from("/srv/data/logs"))
        );
    }

    #[test]
    fn test_from_file_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "logging: {}").unwrap();

        let result = Settings::from_file(&config_path);
        assert!(matches!(result, Err(RouteLogError::InvalidConfig(_))));
    }
}
