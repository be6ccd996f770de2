//! Rotation bookkeeping for the file sink
//!
//! Pure state: policy checks, rotated-name generation, and the retention
//! queue. The sink owns the actual file handling; this module only decides
//! *when* to rotate, *what* the rotated file is called, and *which* old
//! files fall off the end.
//!
//! Naming:
//! - Daily: `<base_path><YYYY-MM-DD>`, dated for the day being closed.
//! - Size: `<base_path>_<N>` with the smallest unused positive N. The
//!   probe index never resets within a process, so rotations from a
//!   restarted process cannot overwrite older ones.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, TimeZone};
use lumber_config::RotatePolicy;

pub(crate) struct RotationState {
    policy: RotatePolicy,
    size_limit: u64,
    max_rotate_files: usize,

    /// Daily policy: precomputed next-midnight boundary
    next_rotate_at_ns: Option<i64>,

    /// Daily policy: the day the active file is collecting
    current_day: Option<NaiveDate>,

    /// Size policy: where the next name probe starts
    next_index: u32,

    /// Rotated files, oldest first
    rotated: VecDeque<PathBuf>,
}

impl RotationState {
    pub fn new(policy: RotatePolicy, size_limit: u64, max_rotate_files: usize) -> Self {
        Self {
            policy,
            size_limit,
            max_rotate_files,
            next_rotate_at_ns: None,
            current_day: None,
            next_index: 1,
            rotated: VecDeque::new(),
        }
    }

    pub fn policy(&self) -> RotatePolicy {
        self.policy
    }

    /// Re-apply mutable settings; switching policy re-seeds the daily
    /// boundary from the next observed record.
    pub fn set_policy(&mut self, policy: RotatePolicy, size_limit: u64, max_rotate_files: usize) {
        if policy != self.policy {
            self.next_rotate_at_ns = None;
            self.current_day = None;
        }
        self.policy = policy;
        self.size_limit = size_limit;
        self.max_rotate_files = max_rotate_files;
    }

    /// Decide whether the write about to happen must rotate first.
    ///
    /// Daily tracking seeds itself from the first timestamp it sees, so an
    /// injected clock drives rotation deterministically.
    pub fn needs_rotation(&mut self, current_size: u64, ts_ns: i64) -> bool {
        match self.policy {
            RotatePolicy::None => false,
            RotatePolicy::Size => current_size >= self.size_limit,
            RotatePolicy::Daily => {
                if self.next_rotate_at_ns.is_none() {
                    self.seed_day(ts_ns);
                }
                matches!(self.next_rotate_at_ns, Some(at) if ts_ns >= at)
            }
        }
    }

    /// Name for the file about to be rotated away
    pub fn rotated_name(&mut self, base: &Path) -> PathBuf {
        match self.policy {
            RotatePolicy::Daily => {
                let day = self.current_day.unwrap_or_else(|| Local::now().date_naive());
                append_suffix(base, &day.format("%Y-%m-%d").to_string())
            }
            _ => {
                // Smallest unused positive index, continuing past any file
                // already on disk.
                let mut index = self.next_index.max(1);
                let mut candidate = append_suffix(base, &format!("_{}", index));
                while candidate.exists() {
                    index += 1;
                    candidate = append_suffix(base, &format!("_{}", index));
                }
                self.next_index = index + 1;
                candidate
            }
        }
    }

    /// Advance state after a completed rotation
    pub fn advance(&mut self, ts_ns: i64) {
        if self.policy == RotatePolicy::Daily {
            self.seed_day(ts_ns);
        }
    }

    /// Record a rotated file; returns the files evicted by retention.
    ///
    /// With `max_rotate_files == 0` the just-rotated file itself is
    /// evicted immediately.
    pub fn retain(&mut self, rotated: PathBuf) -> Vec<PathBuf> {
        self.rotated.push_back(rotated);
        let mut evicted = Vec::new();
        while self.rotated.len() > self.max_rotate_files {
            match self.rotated.pop_front() {
                Some(path) => evicted.push(path),
                None => break,
            }
        }
        evicted
    }

    /// Rotated files currently retained, oldest first
    pub fn retained(&self) -> impl Iterator<Item = &PathBuf> {
        self.rotated.iter()
    }

    fn seed_day(&mut self, ts_ns: i64) {
        self.current_day = day_of_ns(ts_ns);
        self.next_rotate_at_ns = next_midnight_ns(ts_ns);
    }
}

/// `<base><suffix>` as a path, byte-preserving
fn append_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Local calendar day containing the timestamp
fn day_of_ns(ts_ns: i64) -> Option<NaiveDate> {
    let secs = ts_ns.div_euclid(1_000_000_000);
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.date_naive())
}

/// Nanosecond timestamp of the next local midnight after `ts_ns`
fn next_midnight_ns(ts_ns: i64) -> Option<i64> {
    let day = day_of_ns(ts_ns)?;
    let next = day.succ_opt()?.and_hms_opt(0, 0, 0)?;
    let local = Local.from_local_datetime(&next).earliest()?;
    Some(local.timestamp().checked_mul(1_000_000_000)?)
}

#[cfg(test)]
#[path = "rotation_test.rs"]
mod rotation_test;
