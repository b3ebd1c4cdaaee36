//! Heading hold controller
//!
//! Keeps the chassis pointing the same way while it translates. While the driver is rotating
//! the setpoint follows the live heading. Once rotation stops the setpoint keeps following for
//! a drift period, so the robot doesn't snap back to where it was when the stick was released,
//! and is then frozen and held with a PID.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::Serialize;
use util::time::Stopwatch;

use super::{PidController, PidGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HeadingHold {
    /// The heading to hold, `None` before activation.
    ///
    /// Units: radians
    setpoint_rad: Option<f64>,

    /// Time since rotation last stopped.
    drift_timer: Stopwatch,

    /// Set while rotating, cleared (and the drift timer restarted) on the first cycle without
    /// rotation.
    new_setpoint: bool,

    /// Set while waiting for the modules to reach their angles from rest.
    wait: bool,

    /// True once the setpoint has been frozen for the current zero rotation episode.
    frozen: bool,

    drift_period_s: f64,

    pid: PidController,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadingHold {
    pub fn new(gains: PidGains, period_s: f64, drift_period_s: f64) -> Self {
        Self {
            setpoint_rad: None,
            drift_timer: Stopwatch::new(),
            new_setpoint: false,
            wait: false,
            frozen: false,
            drift_period_s,
            pid: PidController::new_angular(gains, period_s),
        }
    }

    /// Start holding, latching the current heading and starting the drift period.
    pub fn activate(&mut self, now_s: f64, heading_rad: f64) {
        self.setpoint_rad = Some(heading_rad);
        self.new_setpoint = false;
        self.frozen = false;
        self.wait = true;
        self.drift_timer.reset(now_s);
        self.drift_timer.start(now_s);
        self.pid.reset();
    }

    /// Stop the drift timer. The setpoint is kept but `activate` must be called before the
    /// controller is used again.
    pub fn deactivate(&mut self, now_s: f64) {
        self.drift_timer.stop(now_s);
        self.pid.reset();
    }

    /// Rotation is being demanded, the setpoint follows the live heading.
    pub fn track(&mut self, heading_rad: f64) {
        self.follow(heading_rad);
        self.new_setpoint = true;
    }

    /// Move the setpoint to the live heading without starting a new drift episode.
    pub fn follow(&mut self, heading_rad: f64) {
        self.setpoint_rad = Some(heading_rad);
        self.frozen = false;
    }

    /// Book-keeping for a cycle without rotation.
    ///
    /// Restarts the drift timer on the first cycle after rotation stops, and keeps the setpoint
    /// on the live heading until the drift period has elapsed. Returns true once the setpoint is
    /// frozen.
    pub fn drift(&mut self, now_s: f64, heading_rad: f64) -> bool {
        if self.new_setpoint {
            self.new_setpoint = false;
            self.drift_timer.reset(now_s);
            self.drift_timer.start(now_s);
        }

        if !self.drift_timer.has_elapsed(now_s, self.drift_period_s) {
            self.setpoint_rad = Some(heading_rad);
            self.frozen = false;
            return false;
        }

        if !self.frozen {
            debug!("Heading setpoint frozen at {:.4} rad", heading_rad);
            self.frozen = true;
            self.pid.reset();
        }

        // The setpoint can only be unset before activation
        if self.setpoint_rad.is_none() {
            self.setpoint_rad = Some(heading_rad);
        }

        true
    }

    /// Run the drift book-keeping and, once frozen, return the rotation correction toward the
    /// frozen setpoint.
    ///
    /// Units: radians/second
    pub fn hold(&mut self, now_s: f64, heading_rad: f64) -> Option<f64> {
        if !self.drift(now_s, heading_rad) {
            return None;
        }

        let setpoint = self.setpoint_rad.unwrap_or(heading_rad);
        Some(self.pid.calculate(heading_rad, setpoint))
    }

    pub fn set_waiting(&mut self, wait: bool) {
        self.wait = wait;
    }

    pub fn is_waiting(&self) -> bool {
        self.wait
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The current heading setpoint.
    ///
    /// Units: radians
    pub fn setpoint_rad(&self) -> Option<f64> {
        self.setpoint_rad
    }
}
