use crate::config::RotationConfig;
use crate::error::{Result, RouteLogError};
use crate::logs::writer::{Level, LogRecord, LogWriter};
use crate::state::{is_state_file, RotationState, StateStore};
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Subdirectory of the log root that receives aged files
pub const ARCHIVE_DIR: &str = "Archive";

/// File name prefix of the rotation log
pub const ROTATION_LOG_PREFIX: &str = "Backup-Logs";

/// Assumed age of the last backup when archived files carry no usable timestamp
const UNKNOWN_BACKUP_AGE_DAYS: i64 = 30;

/// Thresholds for one rotation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationOptions {
    pub age_days: u64,
    pub purge_days: u64,
    pub cadence_days: u64,
    /// Run even when the cadence says it is not due
    pub force: bool,
}

impl Default for RotationOptions {
    fn default() -> Self {
        RotationConfig::default().into()
    }
}

impl From<RotationConfig> for RotationOptions {
    fn from(config: RotationConfig) -> Self {
        Self {
            age_days: config.age_days,
            purge_days: config.purge_days,
            cadence_days: config.cadence_days,
            force: false,
        }
    }
}

/// A batch move of aged files from one directory to another
#[derive(Debug, Clone)]
pub struct MoveRequest<'a> {
    pub source_dir: &'a Path,
    pub dest_dir: &'a Path,
    /// Only files at least this many whole days old are moved
    pub min_age_days: u64,
    pub now: DateTime<Utc>,
    /// Extra attempts for a file whose move failed
    pub retries: u32,
}

/// Result of moving a single file
#[derive(Debug)]
pub struct MoveOutcome {
    pub file: PathBuf,
    pub result: Result<()>,
}

/// Moves every sufficiently old file of a directory in one batch
pub trait BulkMover {
    fn move_aged(&self, request: &MoveRequest<'_>) -> Vec<MoveOutcome>;
}

/// Filesystem mover: rename, falling back to copy and delete across devices
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMover;

impl BulkMover for FsMover {
    fn move_aged(&self, request: &MoveRequest<'_>) -> Vec<MoveOutcome> {
        let candidates = match aged_files(request.source_dir, request.min_age_days, request.now) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Failed to scan {}: {}", request.source_dir.display(), e);
                return Vec::new();
            }
        };

        candidates
            .into_iter()
            .map(|file| {
                let dest = match file.file_name() {
                    Some(name) => request.dest_dir.join(name),
                    None => request.dest_dir.to_path_buf(),
                };

                let mut result = move_file(&file, &dest);
                let mut attempts = 0;
                while result.is_err() && attempts < request.retries {
                    attempts += 1;
                    result = move_file(&file, &dest);
                }

                MoveOutcome { file, result }
            })
            .collect()
    }
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    let to_move_error = |e: std::io::Error| RouteLogError::Move(from.to_path_buf(), e.to_string());

    let modified = fs::metadata(from).and_then(|m| m.modified()).map_err(to_move_error)?;
    fs::copy(from, to).map_err(to_move_error)?;
    // Keep the original timestamp so the archive still ages correctly
    fs::File::options()
        .write(true)
        .open(to)
        .and_then(|f| f.set_modified(modified))
        .map_err(to_move_error)?;
    fs::remove_file(from).map_err(to_move_error)
}

/// Whole days between `modified` and `now`, rounded down
pub fn file_age_days(modified: SystemTime, now: DateTime<Utc>) -> i64 {
    let modified: DateTime<Utc> = modified.into();
    (now - modified).num_days()
}

/// `days` as a time span, or `None` when chrono cannot represent it
fn days_span(days: u64) -> Option<Duration> {
    i64::try_from(days).ok().and_then(Duration::try_days)
}

/// Regular files directly under `dir` that are at least `min_age_days` old
fn aged_files(dir: &Path, min_age_days: u64, now: DateTime<Utc>) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = regular_files(dir)?
        .into_iter()
        .filter(|(_, modified)| {
            // Files dated in the future have a negative age and never qualify
            u64::try_from(file_age_days(*modified, now)).is_ok_and(|age| age >= min_age_days)
        })
        .map(|(path, _)| path)
        .collect();
    files.sort();
    Ok(files)
}

/// Regular files directly under `dir` with their modification times,
/// excluding the rotation state record
fn regular_files(dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else {
            continue;
        };
        if entry
            .file_name()
            .to_str()
            .map(is_state_file)
            .unwrap_or(false)
        {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((entry.path(), modified));
    }

    Ok(files)
}

/// Whether a rotation call did any work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RotationStatus {
    Executed,
    Skipped { next_due: DateTime<Utc> },
}

/// Aggregate outcome of a rotation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    #[serde(flatten)]
    pub status: RotationStatus,
    /// Last rotation the cadence gate saw; `None` when the archive was empty
    pub last_backup: Option<DateTime<Utc>>,
    pub moved: usize,
    pub purged: usize,
    pub move_failures: usize,
    pub delete_failures: usize,
}

impl RotationReport {
    fn skipped(last_backup: DateTime<Utc>, next_due: DateTime<Utc>) -> Self {
        Self {
            status: RotationStatus::Skipped { next_due },
            last_backup: Some(last_backup),
            moved: 0,
            purged: 0,
            move_failures: 0,
            delete_failures: 0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, RotationStatus::Skipped { .. })
    }

    /// Files moved plus files purged
    pub fn operations(&self) -> usize {
        self.moved + self.purged
    }
}

/// Archives aged log files and purges old archives, at most once per cadence
pub struct RotationManager<M = FsMover> {
    mover: M,
}

impl RotationManager<FsMover> {
    pub fn new() -> Self {
        Self { mover: FsMover }
    }
}

impl Default for RotationManager<FsMover> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: BulkMover> RotationManager<M> {
    pub fn with_mover(mover: M) -> Self {
        Self { mover }
    }

    /// Rotate the logs under `path` as of now
    pub fn rotate(&self, path: &Path, options: &RotationOptions) -> Result<RotationReport> {
        self.rotate_at(path, options, Utc::now())
    }

    /// Rotate the logs under `path` as if the current time were `now`
    ///
    /// # Returns
    /// * `Ok(RotationReport)` - Skipped (not due) or executed, with counts
    /// * `Err(RouteLogError)` - `path` is missing or the archive cannot be created
    pub fn rotate_at(
        &self,
        path: &Path,
        options: &RotationOptions,
        now: DateTime<Utc>,
    ) -> Result<RotationReport> {
        if !path.is_dir() {
            return Err(RouteLogError::NotFound(format!(
                "log directory {} does not exist",
                path.display()
            )));
        }

        let archive = path.join(ARCHIVE_DIR);
        let store = StateStore::in_archive(&archive);

        // Phase 1: cadence gate
        let last_backup = last_backup(&archive, &store, now);
        if let (Some(last), false) = (last_backup, options.force) {
            match days_span(options.cadence_days).and_then(|span| last.checked_add_signed(span)) {
                Some(next_due) if now >= next_due => {}
                Some(next_due) => {
                    tracing::info!(
                        "Log rotation not due until {}",
                        next_due.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                    );
                    return Ok(RotationReport::skipped(last, next_due));
                }
                None => {
                    tracing::info!(
                        "Log rotation cadence of {} day(s) never elapses",
                        options.cadence_days
                    );
                    return Ok(RotationReport::skipped(last, DateTime::<Utc>::MAX_UTC));
                }
            }
        }

        // Phase 2: archive aged files, then purge old archives
        fs::create_dir_all(&archive).map_err(|source| RouteLogError::DirectoryCreate {
            path: archive.clone(),
            source,
        })?;

        let outcomes = self.mover.move_aged(&MoveRequest {
            source_dir: path,
            dest_dir: &archive,
            min_age_days: options.age_days,
            now,
            retries: 1,
        });
        let mut moved = 0;
        let mut move_failures = 0;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(()) => moved += 1,
                Err(e) => {
                    tracing::debug!("{}", e);
                    move_failures += 1;
                }
            }
        }

        let (purged, delete_failures) = purge(&archive, options.purge_days, now)?;

        if move_failures + delete_failures > 0 {
            tracing::warn!(
                "Log rotation left {} file(s) in place and failed to delete {} archived file(s)",
                move_failures,
                delete_failures
            );
        }

        if let Err(e) = store.save(&RotationState::new(now, moved, purged)) {
            tracing::warn!("{}", e);
        }

        record_rotation(path, options, now, moved, purged);

        Ok(RotationReport {
            status: RotationStatus::Executed,
            last_backup,
            moved,
            purged,
            move_failures,
            delete_failures,
        })
    }
}

/// Time of the last executed rotation
///
/// The state record wins. Without one, the newest archived file stands in;
/// with neither, rotation has never run and `None` is returned.
fn last_backup(archive: &Path, store: &StateStore, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match store.load() {
        Ok(Some(state)) => return Some(state.last_rotation),
        Ok(None) => {}
        Err(e) => tracing::warn!("{}", e),
    }

    let files = if archive.is_dir() {
        regular_files(archive).unwrap_or_default()
    } else {
        Vec::new()
    };
    if files.is_empty() {
        return None;
    }

    let newest = files
        .iter()
        .map(|(_, modified)| *modified)
        .filter(|modified| *modified > SystemTime::UNIX_EPOCH)
        .max();

    Some(match newest {
        Some(modified) => modified.into(),
        None => now - Duration::days(UNKNOWN_BACKUP_AGE_DAYS),
    })
}

/// Delete archived files at least `purge_days` old; returns (deleted, failed)
fn purge(archive: &Path, purge_days: u64, now: DateTime<Utc>) -> Result<(usize, usize)> {
    let mut purged = 0;
    let mut failures = 0;

    for file in aged_files(archive, purge_days, now)? {
        match fs::remove_file(&file) {
            Ok(()) => purged += 1,
            Err(e) => {
                let err = RouteLogError::Delete(file, e.to_string());
                tracing::debug!("{}", err);
                failures += 1;
            }
        }
    }

    Ok((purged, failures))
}

/// Append a summary line to `Backup-Logs_<date>.log` under the log root
fn record_rotation(path: &Path, options: &RotationOptions, now: DateTime<Utc>, moved: usize, purged: usize) {
    let local = now.with_timezone(&Local);
    let target = path.join(format!(
        "{}_{}.log",
        ROTATION_LOG_PREFIX,
        local.format("%Y%m%d")
    ));
    let message = format!(
        "Moved {} file(s) older than {} day(s) to {}; purged {} file(s) older than {} day(s)",
        moved, options.age_days, ARCHIVE_DIR, purged, options.purge_days
    );
    let record = LogRecord::at(local, Level::Info, ROTATION_LOG_PREFIX, &message);

    if let Err(e) = LogWriter::new().write(&target, &record, false) {
        tracing::warn!("Failed to record log rotation: {}", e);
    }
}
