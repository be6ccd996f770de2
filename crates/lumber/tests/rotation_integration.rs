//! End-to-end rotation tests against the global logger

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{Local, TimeZone};
use parking_lot::Mutex;

use lumber::{Config, ManualTimeSource, RotatePolicy};

static LOCK: Mutex<()> = Mutex::new(());

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn rotated_files(base: &Path) -> Vec<PathBuf> {
    let dir = base.parent().unwrap();
    let prefix = base.file_name().unwrap().to_string_lossy().into_owned();
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p != base
                && p.file_name()
                    .map(|n| n.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

fn local_ns(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
    Local
        .with_ymd_and_hms(y, m, d, h, min, s)
        .single()
        .unwrap()
        .timestamp()
        * 1_000_000_000
}

/// Scenario: size rotation at 1MB with 3000-byte payloads. Two rotated
/// files appear, retention holds, the active file stays under the
/// threshold, and no line is lost.
#[test]
fn test_size_rotation_end_to_end() {
    let _lock = LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("size.log");

    let mut config = Config::default();
    config.logger.performance.buffer_pool_size = 1024;
    config.sink.file.log_path = path.display().to_string();
    config.sink.file.rotate_policy = RotatePolicy::Size;
    config.sink.file.rotate_size_mb = 1;
    config.sink.file.max_rotate_files = 2;
    lumber::init(config).unwrap();

    let payload = "A".repeat(3000);
    for _ in 0..1000 {
        lumber::info!("{}", &payload);
    }
    lumber::sync();

    let rotated = rotated_files(&path);
    assert!(rotated.len() >= 2, "expected at least two rotations");
    assert!(rotated.len() <= 2, "retention bound violated");

    // Active file is freshly rotated territory: below the threshold.
    let active_size = std::fs::metadata(&path).unwrap().len();
    assert!(active_size < 1024 * 1024, "active file is {} bytes", active_size);

    // Rotated files crossed the threshold before being moved aside, and
    // they never grow after the rename.
    for file in &rotated {
        assert!(std::fs::metadata(file).unwrap().len() >= 1024 * 1024);
    }

    // Every record is in exactly one file.
    let mut total = read_lines(&path).len();
    for file in &rotated {
        total += read_lines(file).len();
    }
    assert_eq!(total, 1000);

    assert_eq!(lumber::drop_count(), 0);
    lumber::shutdown();
}

/// Scenario: daily rotation driven by an injected clock. Crossing
/// midnight produces exactly one rotated file named for the closed day;
/// the active file holds only the new day's records.
#[test]
fn test_daily_rotation_with_injected_clock() {
    let _lock = LOCK.lock();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daily.log");

    let day_one = local_ns(2026, 7, 3, 15, 30, 0);
    let clock = Arc::new(ManualTimeSource::new(day_one));

    let mut config = Config::default();
    config.logger.performance.buffer_pool_size = 1024;
    config.sink.file.log_path = path.display().to_string();
    config.sink.file.rotate_policy = RotatePolicy::Daily;
    config.sink.file.max_rotate_files = 7;
    lumber::init_with_time_source(config, clock.clone()).unwrap();

    for i in 0..10u32 {
        lumber::info!("first day {}", i);
    }
    lumber::sync();

    // Advance the injected clock past midnight and let the coarse-clock
    // timer pick it up before submitting again.
    clock.set_ns(local_ns(2026, 7, 4, 0, 0, 10));
    thread::sleep(Duration::from_millis(20));

    for i in 0..10u32 {
        lumber::info!("second day {}", i);
    }
    lumber::sync();

    let rotated = rotated_files(&path);
    assert_eq!(rotated.len(), 1);
    assert!(
        rotated[0].to_string_lossy().ends_with("daily.log2026-07-03"),
        "rotated file was {:?}",
        rotated[0]
    );
    assert_eq!(read_lines(&rotated[0]).len(), 10);

    let active = read_lines(&path);
    assert_eq!(active.len(), 10);
    assert!(active[0].contains("second day 0"));

    lumber::shutdown();
}
