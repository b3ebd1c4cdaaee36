//! Target bearing controller
//!
//! Drives the heading toward the target while adjusting. The cargo release point is offset from
//! the centre of the robot, so rather than face the target directly the chassis faces one of two
//! bearings either side of it, whichever needs the smaller turn.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use comms_if::eqpt::vision::VisionSample;
use util::maths::{get_ang_dist, wrap_pi};

use crate::loc::Pose;
use super::{PidController, PidGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TargetBearing {
    pid: PidController,

    /// Release point lead angle.
    ///
    /// Units: radians
    offset_rad: f64,

    /// Field position of the target used when vision can't see it.
    ///
    /// Units: meters
    target_pos_m: [f64; 2],
}

/// The result of one target bearing calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BearingCorrection {
    /// Rotation demand toward the chosen candidate.
    ///
    /// Units: radians/second
    pub rotation_rads: f64,

    /// Field bearing of the target before the offset was applied.
    ///
    /// Units: radians
    pub target_bearing_rad: f64,

    /// The candidate bearing the chassis is being turned to.
    ///
    /// Units: radians
    pub setpoint_rad: f64,

    /// Where the target bearing came from.
    pub source: BearingSource,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BearingSource {
    /// The target yaw reported by vision.
    Vision,

    /// Computed from the odometry pose and the known target position.
    Odometry,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TargetBearing {
    pub fn new(gains: PidGains, period_s: f64, offset_rad: f64, target_pos_m: [f64; 2]) -> Self {
        Self {
            pid: PidController::new_angular(gains, period_s),
            offset_rad,
            target_pos_m,
        }
    }

    /// Field bearing from the robot to the target.
    ///
    /// Vision is used whenever it has the target and resolved its yaw, otherwise the bearing is
    /// computed from odometry. Falling back is expected and isn't reported as a fault.
    pub fn target_bearing(&self, pose: &Pose, vision: &VisionSample) -> (f64, BearingSource) {
        match vision.bearing_rad() {
            Some(yaw_rad) => (wrap_pi(pose.heading_rad - yaw_rad), BearingSource::Vision),
            None => (pose.bearing_to(&self.target_pos_m), BearingSource::Odometry),
        }
    }

    /// Calculate the rotation demand for this cycle.
    pub fn correction(&mut self, pose: &Pose, vision: &VisionSample) -> BearingCorrection {
        let (target_bearing_rad, source) = self.target_bearing(pose, vision);
        let setpoint_rad = choose_candidate(pose.heading_rad, target_bearing_rad, self.offset_rad);

        BearingCorrection {
            rotation_rads: self.pid.calculate(pose.heading_rad, setpoint_rad),
            target_bearing_rad,
            setpoint_rad,
            source,
        }
    }

    /// Clear the controller history, used when adjusting starts again.
    pub fn reset(&mut self) {
        self.pid.reset();
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Choose between `bearing - offset` and `bearing + offset`, returning the candidate with the
/// smaller circular distance from `heading`. Ties go to `bearing - offset`.
pub fn choose_candidate(heading_rad: f64, bearing_rad: f64, offset_rad: f64) -> f64 {
    let minus = wrap_pi(bearing_rad - offset_rad);
    let plus = wrap_pi(bearing_rad + offset_rad);

    if get_ang_dist(heading_rad, minus).abs() <= get_ang_dist(heading_rad, plus).abs() {
        minus
    }
    else {
        plus
    }
}
