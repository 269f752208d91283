//! Session and tracking state.
//!
//! [`SessionState`] is scoped to one encounter and is reset by new-session and
//! destination-drop markers. [`TrackingState`] lives for the whole process
//! run. Both are owned by the run loop and passed by reference into the
//! classifier and router; neither is persisted.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use crate::dedup::DuplicateGuard;

/// Seconds in an hour, for kill-rate projection.
const SECS_PER_HOUR: f64 = 3600.0;

/// Encounter-scoped counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    scanned_targets: HashSet<String>,
    last_kill: Option<DateTime<FixedOffset>>,
    cumulative_kill_interval: f64,
    kill_count: u32,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records a scanned target. Returns `true` if it was not already recorded
    /// this encounter.
    pub fn mark_scanned(&mut self, target: &str) -> bool {
        self.scanned_targets.insert(target.to_string())
    }

    /// Forgets scanned targets without touching kill statistics.
    pub fn clear_scans(&mut self) {
        self.scanned_targets.clear();
    }

    #[must_use]
    pub fn has_scanned(&self, target: &str) -> bool {
        self.scanned_targets.contains(target)
    }

    /// Records a confirmed kill at `at` and returns the seconds elapsed since
    /// the previous kill, if there was one.
    pub fn record_kill(&mut self, at: DateTime<FixedOffset>) -> Option<f64> {
        self.kill_count += 1;

        let interval = self.last_kill.map(|previous| {
            let secs = (at - previous).num_milliseconds() as f64 / 1000.0;
            self.cumulative_kill_interval += secs;
            secs
        });

        self.last_kill = Some(at);
        interval
    }

    #[must_use]
    pub fn kill_count(&self) -> u32 {
        self.kill_count
    }

    #[must_use]
    pub fn last_kill(&self) -> Option<DateTime<FixedOffset>> {
        self.last_kill
    }

    /// Sum of all inter-kill intervals, in seconds.
    #[must_use]
    pub fn cumulative_kill_interval(&self) -> f64 {
        self.cumulative_kill_interval
    }

    /// Mean seconds between kills. `None` until there are two kills.
    #[must_use]
    pub fn average_kill_interval(&self) -> Option<f64> {
        if self.kill_count < 2 {
            return None;
        }
        Some(self.cumulative_kill_interval / f64::from(self.kill_count - 1))
    }

    /// Projected kills per hour from the average interval, rounded to one
    /// decimal. `None` when the average is unknown or zero.
    #[must_use]
    pub fn kills_per_hour(&self) -> Option<f64> {
        let average = self.average_kill_interval()?;
        if average <= 0.0 {
            return None;
        }
        Some((SECS_PER_HOUR / average * 10.0).round() / 10.0)
    }
}

/// Process-lifetime counters and bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct TrackingState {
    /// Last reported hull integrity of the deployed fighter.
    pub last_fighter_hull: Option<f64>,

    /// Notifications written to the terminal.
    pub total_logged: u64,

    /// Massacre missions whose kill target was reached.
    pub mission_completions: u32,

    /// `event` tag of the previous record.
    pub last_event_kind: Option<String>,

    /// Remote duplicate suppression.
    pub dedup: DuplicateGuard,
}

impl TrackingState {
    #[must_use]
    pub fn new(duplicate_cap: u32) -> Self {
        Self {
            dedup: DuplicateGuard::new(duplicate_cap),
            ..Self::default()
        }
    }

    /// Whether the previous record had the given kind.
    #[must_use]
    pub fn previous_was(&self, kind: &str) -> bool {
        self.last_event_kind.as_deref() == Some(kind)
    }
}
