use chrono::{Duration, Utc};
use routelog::error::RouteLogError;
use routelog::logs::{
    BulkMover, MoveOutcome, MoveRequest, RotationManager, RotationOptions, RotationStatus,
    ARCHIVE_DIR, ROTATION_LOG_PREFIX,
};
use std::fs;
use std::path::Path;
use std::time::{Duration as StdDuration, SystemTime};
use tempfile::TempDir;

const DAY: u64 = 24 * 60 * 60;

fn touch(path: &Path, age: StdDuration) {
    fs::write(path, "2024-01-01 00:00:00 entry\n").unwrap();
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_age_threshold_is_inclusive_whole_days() {
    let temp_dir = TempDir::new().unwrap();
    touch(
        &temp_dir.path().join("Deploy_old.log"),
        StdDuration::from_secs(7 * DAY + 60),
    );
    touch(
        &temp_dir.path().join("Deploy_recent.log"),
        StdDuration::from_secs(7 * DAY - 3600),
    );

    let report = RotationManager::new()
        .rotate(temp_dir.path(), &RotationOptions::default())
        .unwrap();

    assert_eq!(report.status, RotationStatus::Executed);
    assert_eq!(report.last_backup, None);
    assert_eq!(report.moved, 1);
    assert!(temp_dir.path().join(ARCHIVE_DIR).join("Deploy_old.log").exists());
    assert!(temp_dir.path().join("Deploy_recent.log").exists());
}

#[test]
fn test_second_rotation_within_cadence_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    touch(&temp_dir.path().join("a.log"), StdDuration::from_secs(10 * DAY));
    let manager = RotationManager::new();
    let options = RotationOptions::default();

    let first = manager.rotate(temp_dir.path(), &options).unwrap();
    assert_eq!(first.moved, 1);

    touch(&temp_dir.path().join("b.log"), StdDuration::from_secs(10 * DAY));
    let second = manager.rotate(temp_dir.path(), &options).unwrap();

    assert!(second.is_skipped());
    assert_eq!(second.operations(), 0);
    assert!(temp_dir.path().join("b.log").exists());
    match second.status {
        RotationStatus::Skipped { next_due } => {
            assert!(next_due > Utc::now() + Duration::days(9));
        }
        RotationStatus::Executed => panic!("expected skipped"),
    }
}

#[test]
fn test_force_overrides_cadence() {
    let temp_dir = TempDir::new().unwrap();
    touch(&temp_dir.path().join("a.log"), StdDuration::from_secs(10 * DAY));
    let manager = RotationManager::new();

    manager
        .rotate(temp_dir.path(), &RotationOptions::default())
        .unwrap();
    touch(&temp_dir.path().join("b.log"), StdDuration::from_secs(10 * DAY));

    let forced = manager
        .rotate(
            temp_dir.path(),
            &RotationOptions {
                force: true,
                ..RotationOptions::default()
            },
        )
        .unwrap();

    assert_eq!(forced.status, RotationStatus::Executed);
    assert_eq!(forced.moved, 1);
    assert!(forced.last_backup.is_some());
}

#[test]
fn test_rotation_that_moved_nothing_still_starts_cadence() {
    let temp_dir = TempDir::new().unwrap();
    touch(&temp_dir.path().join("a.log"), StdDuration::from_secs(6 * DAY));
    let manager = RotationManager::new();
    let options = RotationOptions::default();
    let now = Utc::now();

    let first = manager.rotate_at(temp_dir.path(), &options, now).unwrap();
    assert_eq!(first.status, RotationStatus::Executed);
    assert_eq!(first.moved, 0);

    // a.log is now old enough, but the cadence has not elapsed
    let second = manager
        .rotate_at(temp_dir.path(), &options, now + Duration::days(2))
        .unwrap();
    assert!(second.is_skipped());
    assert_eq!(second.last_backup, Some(now));
    assert_eq!(second.operations(), 0);
    assert!(temp_dir.path().join("a.log").exists());
}

#[test]
fn test_cleared_archive_makes_rotation_due() {
    let temp_dir = TempDir::new().unwrap();
    touch(&temp_dir.path().join("a.log"), StdDuration::from_secs(8 * DAY));
    let manager = RotationManager::new();
    let options = RotationOptions::default();

    manager.rotate(temp_dir.path(), &options).unwrap();
    fs::remove_dir_all(temp_dir.path().join(ARCHIVE_DIR)).unwrap();
    touch(&temp_dir.path().join("b.log"), StdDuration::from_secs(8 * DAY));

    let report = manager.rotate(temp_dir.path(), &options).unwrap();

    assert_eq!(report.status, RotationStatus::Executed);
    assert_eq!(report.last_backup, None);
    assert_eq!(report.moved, 1);
}

#[test]
fn test_unrepresentable_age_thresholds_match_nothing() {
    let temp_dir = TempDir::new().unwrap();
    touch(&temp_dir.path().join("fresh.log"), StdDuration::from_secs(60));

    let report = RotationManager::new()
        .rotate(
            temp_dir.path(),
            &RotationOptions {
                age_days: u64::MAX,
                purge_days: u64::MAX,
                ..RotationOptions::default()
            },
        )
        .unwrap();

    assert_eq!(report.status, RotationStatus::Executed);
    assert_eq!(report.operations(), 0);
    assert!(temp_dir.path().join("fresh.log").exists());
}

#[test]
fn test_unrepresentable_cadence_never_elapses() {
    let temp_dir = TempDir::new().unwrap();
    touch(&temp_dir.path().join("a.log"), StdDuration::from_secs(10 * DAY));
    let manager = RotationManager::new();
    let now = Utc::now();

    manager
        .rotate_at(temp_dir.path(), &RotationOptions::default(), now)
        .unwrap();
    touch(&temp_dir.path().join("b.log"), StdDuration::from_secs(10 * DAY));

    for cadence_days in [1_000_000_000, u64::MAX] {
        let report = manager
            .rotate_at(
                temp_dir.path(),
                &RotationOptions {
                    cadence_days,
                    ..RotationOptions::default()
                },
                now + Duration::days(365),
            )
            .unwrap();
        assert!(report.is_skipped());
        assert_eq!(report.operations(), 0);
    }
    assert!(temp_dir.path().join("b.log").exists());
}

#[test]
fn test_rotation_due_after_cadence_elapses() {
    let temp_dir = TempDir::new().unwrap();
    touch(&temp_dir.path().join("a.log"), StdDuration::from_secs(10 * DAY));
    let manager = RotationManager::new();
    let options = RotationOptions::default();
    let now = Utc::now();

    manager.rotate_at(temp_dir.path(), &options, now).unwrap();

    let early = manager
        .rotate_at(temp_dir.path(), &options, now + Duration::days(9))
        .unwrap();
    assert!(early.is_skipped());

    let due = manager
        .rotate_at(temp_dir.path(), &options, now + Duration::days(10))
        .unwrap();
    assert_eq!(due.status, RotationStatus::Executed);
}

#[test]
fn test_purge_deletes_old_archives_only() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join(ARCHIVE_DIR);
    fs::create_dir(&archive).unwrap();
    touch(&archive.join("ancient.log"), StdDuration::from_secs(91 * DAY));
    touch(&archive.join("older.log"), StdDuration::from_secs(89 * DAY));

    let report = RotationManager::new()
        .rotate(temp_dir.path(), &RotationOptions::default())
        .unwrap();

    assert_eq!(report.status, RotationStatus::Executed);
    assert_eq!(report.purged, 1);
    assert!(!archive.join("ancient.log").exists());
    assert!(archive.join("older.log").exists());
}

#[test]
fn test_rotation_is_recorded_in_backup_log() {
    let temp_dir = TempDir::new().unwrap();
    touch(&temp_dir.path().join("a.log"), StdDuration::from_secs(8 * DAY));

    RotationManager::new()
        .rotate(temp_dir.path(), &RotationOptions::default())
        .unwrap();

    let names = file_names(temp_dir.path());
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with(&format!("{}_", ROTATION_LOG_PREFIX)));

    let content = fs::read_to_string(temp_dir.path().join(&names[0])).unwrap();
    assert!(content.contains("Moved 1 file(s)"));
}

struct FailingMover;

impl BulkMover for FailingMover {
    fn move_aged(&self, request: &MoveRequest<'_>) -> Vec<MoveOutcome> {
        let file = request.source_dir.join("locked.log");
        vec![MoveOutcome {
            result: Err(RouteLogError::Move(file.clone(), "file in use".to_string())),
            file,
        }]
    }
}

#[test]
fn test_move_failures_are_counted_not_fatal() {
    let temp_dir = TempDir::new().unwrap();

    let report = RotationManager::with_mover(FailingMover)
        .rotate(temp_dir.path(), &RotationOptions::default())
        .unwrap();

    assert_eq!(report.status, RotationStatus::Executed);
    assert_eq!(report.moved, 0);
    assert_eq!(report.move_failures, 1);
}

#[test]
fn test_missing_root_is_a_warning() {
    let temp_dir = TempDir::new().unwrap();
    let err = RotationManager::new()
        .rotate(&temp_dir.path().join("nope"), &RotationOptions::default())
        .unwrap_err();
    assert!(err.is_warning());
}
