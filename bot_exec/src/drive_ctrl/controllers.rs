//! # Drive controllers module
//!
//! This module provides the PID controller used by the heading hold, target bearing and turn to
//! angle controllers.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains and limits for a PID controller, as they appear in the parameter files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Dervative gain
    pub k_d: f64,

    /// Error below which the controller is considered to be at its setpoint
    pub tolerance: f64,
}

/// A PID controller running at a fixed period.
///
/// Unlike a wall-clock timed controller the period is fixed by the control loop, which makes
/// the output a pure function of the error sequence.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    gains: PidGains,

    /// Period between calls to `calculate`.
    ///
    /// Units: seconds
    period_s: f64,

    /// If set errors are wrapped into [-pi, pi), for controlling angles.
    continuous: bool,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(gains: PidGains, period_s: f64) -> Self {
        Self {
            gains,
            period_s,
            continuous: false,
            prev_error: None,
            integral: 0f64,
        }
    }

    /// Create a new controller for angles, wrapping the error over [-pi, pi).
    pub fn new_angular(gains: PidGains, period_s: f64) -> Self {
        let mut c = Self::new(gains, period_s);
        c.continuous = true;
        c
    }

    /// Get the controller output driving `measurement` toward `setpoint`.
    pub fn calculate(&mut self, measurement: f64, setpoint: f64) -> f64 {
        let error = match self.continuous {
            true => wrap_pi(setpoint - measurement),
            false => setpoint - measurement,
        };

        self.integral += error * self.period_s;

        // No derivative on the first sample, there's nothing to difference against
        let deriv = match self.prev_error {
            Some(e) => (error - e) / self.period_s,
            None => 0f64,
        };

        self.prev_error = Some(error);

        self.gains.k_p * error 
            + self.gains.k_i * self.integral 
            + self.gains.k_d * deriv
    }

    /// True if the last error passed through the controller was within tolerance.
    pub fn at_setpoint(&self) -> bool {
        match self.prev_error {
            Some(e) => e.abs() < self.gains.tolerance,
            None => false,
        }
    }

    /// The last error, if `calculate` has been called since the last reset.
    pub fn last_error(&self) -> Option<f64> {
        self.prev_error
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0f64;
    }
}
