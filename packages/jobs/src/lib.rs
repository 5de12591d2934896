#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The Job Registry.
//!
//! Process-wide state keyed by user id, guarded by a single mutex and
//! held in a `Mutex<HashMap<UserId, JobStatus>>`. Entries are ephemeral —
//! resuming across process restarts is explicitly out of scope; clients
//! poll for status instead of subscribing.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Status of one user's in-flight bulk operation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    /// Whether a bulk run is currently in flight for this user.
    pub is_running: bool,
    /// Total units of work expected.
    pub total: u64,
    /// Units of work completed so far.
    pub processed: u64,
    /// When the current run started.
    pub start_time: Option<DateTime<Utc>>,
    /// The last error observed, if the run failed or a unit errored.
    pub last_error: Option<String>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            is_running: false,
            total: 0,
            processed: 0,
            start_time: None,
            last_error: None,
        }
    }
}

impl JobStatus {
    /// Estimated seconds remaining, extrapolated linearly from elapsed
    /// time and completed/total units. `None` if not running, nothing has
    /// completed yet, or the total is zero.
    #[must_use]
    pub fn eta_seconds(&self) -> Option<i64> {
        if !self.is_running || self.processed == 0 || self.total == 0 {
            return None;
        }
        let start = self.start_time?;
        let elapsed = (Utc::now() - start).num_seconds().max(0);
        let rate = self.processed as f64 / elapsed.max(1) as f64;
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.processed) as f64;
        Some((remaining / rate) as i64)
    }
}

/// A process-wide, mutex-guarded registry of per-user job status.
#[derive(Default)]
pub struct JobRegistry {
    entries: Mutex<HashMap<i64, JobStatus>>,
}

impl JobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a bulk run as starting for `user_id`, resetting counters.
    pub fn start(&self, user_id: i64, total: u64) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.insert(
            user_id,
            JobStatus {
                is_running: true,
                total,
                processed: 0,
                start_time: Some(Utc::now()),
                last_error: None,
            },
        );
    }

    /// Advances `processed` by one unit for `user_id`. A no-op if no run
    /// is registered (defensive against out-of-order completion signals).
    pub fn increment(&self, user_id: i64) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        if let Some(status) = entries.get_mut(&user_id) {
            status.processed += 1;
        }
    }

    /// Records an error without stopping the run (the bulk flow continues
    /// past per-item failures).
    pub fn record_error(&self, user_id: i64, error: impl Into<String>) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        if let Some(status) = entries.get_mut(&user_id) {
            status.last_error = Some(error.into());
        }
    }

    /// Marks the run for `user_id` as finished (`is_running = false`);
    /// `total`/`processed` remain for the final status poll.
    pub fn finish(&self, user_id: i64) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        if let Some(status) = entries.get_mut(&user_id) {
            status.is_running = false;
        }
    }

    /// Returns the current status for `user_id`, or the default
    /// (not-running, zeroed) status if nothing has ever run.
    #[must_use]
    pub fn status(&self, user_id: i64) -> JobStatus {
        let entries = self.entries.lock().expect("lock poisoned");
        entries.get(&user_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_increment_tracks_progress() {
        let registry = JobRegistry::new();
        registry.start(1, 10);
        registry.increment(1);
        registry.increment(1);

        let status = registry.status(1);
        assert!(status.is_running);
        assert_eq!(status.total, 10);
        assert_eq!(status.processed, 2);
    }

    #[test]
    fn finish_clears_is_running_but_keeps_counts() {
        let registry = JobRegistry::new();
        registry.start(1, 5);
        registry.increment(1);
        registry.finish(1);

        let status = registry.status(1);
        assert!(!status.is_running);
        assert_eq!(status.processed, 1);
    }

    #[test]
    fn unknown_user_gets_default_status() {
        let registry = JobRegistry::new();
        let status = registry.status(42);
        assert_eq!(status, JobStatus::default());
    }

    #[test]
    fn record_error_does_not_stop_run() {
        let registry = JobRegistry::new();
        registry.start(1, 5);
        registry.record_error(1, "paper 3 fetch failed");
        let status = registry.status(1);
        assert!(status.is_running);
        assert_eq!(status.last_error.as_deref(), Some("paper 3 fetch failed"));
    }
}
