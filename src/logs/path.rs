use crate::error::{Result, RouteLogError};
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// Subdirectory of the user's documents that holds the logs
pub const LOGS_SUBDIR: &str = "Logs";

/// A mounted filesystem whose source is a network share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedDrive {
    /// Where the share is mounted locally (drive letter or mount point)
    pub mount_point: PathBuf,
    /// Remote root of the share, e.g. `\\server\share`
    pub remote_root: String,
}

/// Source of the currently mounted network drives
pub trait DriveTable {
    fn mounted_drives(&self) -> Vec<MountedDrive>;
}

/// Reads mounted disks from the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDrives;

impl DriveTable for SystemDrives {
    fn mounted_drives(&self) -> Vec<MountedDrive> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .filter_map(|disk| {
                let name = disk.name().to_string_lossy();
                if is_unc(&name) {
                    Some(MountedDrive {
                        mount_point: disk.mount_point().to_path_buf(),
                        remote_root: name.into_owned(),
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Derives the logging root directory
pub struct PathResolver<D = SystemDrives> {
    drives: D,
}

impl PathResolver<SystemDrives> {
    /// Resolver backed by the operating system's drive table
    pub fn new() -> Self {
        Self {
            drives: SystemDrives,
        }
    }
}

impl Default for PathResolver<SystemDrives> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DriveTable> PathResolver<D> {
    pub fn with_drives(drives: D) -> Self {
        Self { drives }
    }

    /// Resolve the logging root
    ///
    /// A valid `override_path` wins. Otherwise the root is `<documents>/Logs`.
    /// Either way a UNC path is rewritten onto the local mount of its share
    /// when one exists.
    pub fn resolve(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = override_path {
            if is_valid_override(path) {
                return Ok(self.unmap_unc(path));
            }
            tracing::warn!(
                "Ignoring invalid logging path override: {}",
                path.display()
            );
        }

        let documents = dirs::document_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
            .ok_or_else(|| {
                RouteLogError::PathResolution(
                    "neither a documents nor a home directory is available".to_string(),
                )
            })?;

        Ok(self.unmap_unc(&documents.join(LOGS_SUBDIR)))
    }

    /// Rewrite `\\server\share\rest` onto the mount point of `\\server\share`
    pub fn unmap_unc(&self, path: &Path) -> PathBuf {
        let raw = path.to_string_lossy();
        let Some((prefix, rest)) = split_unc(&raw) else {
            return path.to_path_buf();
        };

        let drive = self
            .drives
            .mounted_drives()
            .into_iter()
            .find(|drive| normalize_unc(&drive.remote_root).eq_ignore_ascii_case(&prefix));

        match drive {
            Some(drive) => {
                let mapped = rest
                    .iter()
                    .fold(drive.mount_point.clone(), |acc, part| acc.join(part));
                tracing::debug!(
                    "Mapped UNC path {} to {}",
                    path.display(),
                    mapped.display()
                );
                mapped
            }
            None => path.to_path_buf(),
        }
    }
}

/// An override must be non-empty and must not name an existing regular file
pub fn is_valid_override(path: &Path) -> bool {
    !path.as_os_str().is_empty() && !path.is_file()
}

fn is_unc(s: &str) -> bool {
    s.starts_with("\\\\") || s.starts_with("//")
}

/// `\\server\share` with backslashes and no trailing separator
fn normalize_unc(s: &str) -> String {
    let parts: Vec<&str> = s
        .split(|c: char| c == '\\' || c == '/')
        .filter(|part| !part.is_empty())
        .collect();
    format!("\\\\{}", parts.join("\\"))
}

/// Split a UNC path into its `\\server\share` prefix and remaining components
fn split_unc(s: &str) -> Option<(String, Vec<String>)> {
    if !is_unc(s) {
        return None;
    }

    let parts: Vec<&str> = s
        .split(|c: char| c == '\\' || c == '/')
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 2 {
        return None;
    }

    let prefix = format!("\\\\{}\\{}", parts[0], parts[1]);
    let rest = parts[2..].iter().map(|part| part.to_string()).collect();
    Some((prefix, rest))
}
