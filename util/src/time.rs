//! General time utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A stopwatch driven by externally supplied timestamps.
///
/// Controllers never read the clock themselves, they are given the cycle time in their input
/// data and pass it into the stopwatch. This keeps every cycle deterministic for a given input
/// sequence.
///
/// Semantics:
/// - `start` begins accumulating from `now` if not already running.
/// - `stop` adds the running interval to the accumulated time.
/// - `reset` zeroes the accumulated time, a running stopwatch restarts from `now`.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct Stopwatch {
    /// Time the current running interval began, `None` when stopped.
    ///
    /// Units: seconds
    start_time_s: Option<f64>,

    /// Time accumulated over previous running intervals.
    ///
    /// Units: seconds
    accumulated_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now_s: f64) {
        if self.start_time_s.is_none() {
            self.start_time_s = Some(now_s);
        }
    }

    pub fn stop(&mut self, now_s: f64) {
        if let Some(t0) = self.start_time_s.take() {
            self.accumulated_s += (now_s - t0).max(0.0);
        }
    }

    pub fn reset(&mut self, now_s: f64) {
        self.accumulated_s = 0.0;
        if self.start_time_s.is_some() {
            self.start_time_s = Some(now_s);
        }
    }

    pub fn is_running(&self) -> bool {
        self.start_time_s.is_some()
    }

    /// Total elapsed time at `now_s`.
    pub fn get(&self, now_s: f64) -> f64 {
        match self.start_time_s {
            Some(t0) => self.accumulated_s + (now_s - t0).max(0.0),
            None => self.accumulated_s,
        }
    }

    /// True if at least `period_s` has elapsed at `now_s`.
    pub fn has_elapsed(&self, now_s: f64, period_s: f64) -> bool {
        self.get(now_s) >= period_s
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}
